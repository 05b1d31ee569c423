use anyhow::{Context, Result, bail};
use clap::Parser;
use here_traffic::geo::{GeospatialFilter, LocationReference, validate_bbox_string};
use here_traffic::http::{DEFAULT_MAX_RETRIES, JsonObject, QueryParams, RetryPolicy};
use here_traffic::runtime::RealEnv;
use here_traffic::{AsyncTrafficClient, Credential, HttpConfig, TrafficConfig};
use std::time::Duration;

/// here-traffic - HERE Traffic API client
///
/// Query real-time traffic flow, incidents and coverage from the HERE Traffic API.
///
/// Authenticate with an API key (HERE_API_KEY) or an OAuth key pair
/// (HERE_ACCESS_KEY_ID and HERE_ACCESS_KEY_SECRET). Endpoint URLs can be
/// overridden with HERE_TRAFFIC_V7_BASE_URL and friends.
///
/// Examples:
///   here-traffic flow --circle 52.5308,13.3847,500
///   here-traffic incidents --bbox "52.5,13.3;52.6,13.4"
#[derive(Parser, Debug)]
#[command(author, version = env!("HERE_TRAFFIC_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key (also via HERE_API_KEY)
    #[arg(long, env = "HERE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// OAuth access key id (also via HERE_ACCESS_KEY_ID)
    #[arg(long, env = "HERE_ACCESS_KEY_ID", global = true)]
    access_key_id: Option<String>,

    /// OAuth access key secret (also via HERE_ACCESS_KEY_SECRET)
    #[arg(long, env = "HERE_ACCESS_KEY_SECRET", hide_env_values = true, global = true)]
    access_key_secret: Option<String>,

    /// Serve every API version and the token endpoint from one base URL
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Retries after the first attempt for transient failures
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RETRIES, global = true)]
    max_retries: u32,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_timeout, global = true)]
    timeout: Option<Duration>,

    /// Log every request attempt (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Real-time traffic flow for an area
    Flow(AreaArgs),

    /// Traffic incidents for an area
    Incidents(AreaArgs),

    /// API availability and coverage
    Availability,

    /// Acquire an OAuth token to check credentials (the token is never printed)
    Token,
}

#[derive(clap::Args, Debug)]
struct AreaArgs {
    /// Circle as LAT,LON,RADIUS_METERS
    #[arg(
        long,
        value_name = "LAT,LON,RADIUS",
        conflicts_with = "bbox",
        required_unless_present = "bbox"
    )]
    circle: Option<String>,

    /// Bounding box as LAT1,LON1;LAT2,LON2
    #[arg(long, value_name = "LAT1,LON1;LAT2,LON2")]
    bbox: Option<String>,

    /// Location referencing: shape, tmc or olr
    #[arg(long, default_value = "shape")]
    location_referencing: LocationReference,
}

impl AreaArgs {
    fn filter(&self) -> Result<String> {
        match (&self.circle, &self.bbox) {
            (Some(circle), _) => {
                let (lat, lon, radius) = parse_circle(circle)?;
                Ok(GeospatialFilter::circle(lat, lon, radius)?)
            }
            (None, Some(bbox)) => Ok(format!("bbox:{}", validate_bbox_string(bbox)?)),
            (None, None) => bail!("either --circle or --bbox is required"),
        }
    }
}

fn parse_timeout(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("timeout must be a number, got {:?}", raw))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("timeout must be a non-negative number, got {:?}", raw));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| format!("timeout is out of range, got {:?}", raw))
}

fn parse_circle(raw: &str) -> Result<(f64, f64, u32)> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [lat, lon, radius] = parts.as_slice() else {
        bail!("circle must be LAT,LON,RADIUS, got {:?}", raw);
    };
    let lat = lat.parse().with_context(|| format!("invalid latitude {:?}", lat))?;
    let lon = lon.parse().with_context(|| format!("invalid longitude {:?}", lon))?;
    let radius = radius
        .parse()
        .with_context(|| format!("invalid radius {:?}", radius))?;
    Ok((lat, lon, radius))
}

fn credential(cli: &Cli) -> Result<Credential> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match (
        non_empty(&cli.access_key_id),
        non_empty(&cli.access_key_secret),
        non_empty(&cli.api_key),
    ) {
        (Some(id), Some(secret), _) => Ok(Credential::oauth(id, secret)),
        (None, None, Some(key)) => Ok(Credential::api_key(key)),
        (Some(_), None, _) | (None, Some(_), _) => {
            bail!("both --access-key-id and --access-key-secret are required for OAuth")
        }
        (None, None, None) => bail!(
            "no credentials: pass --api-key or --access-key-id/--access-key-secret (or set HERE_API_KEY)"
        ),
    }
}

fn print_payload(data: &JsonObject, request_id: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    eprintln!("request_id: {}", request_id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let credential = credential(&cli)?;

    let mut config = match &cli.base_url {
        Some(url) => TrafficConfig::with_base_url(url),
        None => TrafficConfig::from_env(&RealEnv)?,
    };
    if let Some(timeout) = cli.timeout {
        config.http_timeout = timeout;
    }

    let http = HttpConfig::default()
        .with_retry(RetryPolicy {
            max_retries: cli.max_retries,
            timeout: config.http_timeout,
            ..RetryPolicy::default()
        })
        .with_logging(cli.verbose > 0);

    let client = AsyncTrafficClient::connect(credential.clone(), config, http).await?;

    match &cli.command {
        Commands::Flow(area) => {
            let resp = client
                .v7_flow(area.location_referencing, area.filter()?, QueryParams::new())
                .await?;
            print_payload(&resp.data, &resp.request_id)?;
        }
        Commands::Incidents(area) => {
            let resp = client
                .v7_incidents(area.location_referencing, area.filter()?, QueryParams::new())
                .await?;
            print_payload(&resp.data, &resp.request_id)?;
        }
        Commands::Availability => {
            let resp = client.v7_availability(QueryParams::new()).await?;
            print_payload(&resp.data, &resp.request_id)?;
        }
        Commands::Token => {
            if !credential.is_oauth() {
                bail!("the token command needs --access-key-id and --access-key-secret");
            }
            client.access_token().await?;
            let expires_at = client
                .blocking()
                .auth()
                .cached_token()
                .map(|t| t.expires_at.to_rfc3339())
                .unwrap_or_default();
            println!(
                "OAuth token acquired from {} (expires {})",
                client.blocking().auth().token_url(),
                expires_at
            );
        }
    }
    Ok(())
}
