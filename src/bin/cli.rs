// Raffle Server CLI
// Drives a running server from the terminal and validates its behaviour end to end

use clap::{Parser, Subcommand};
use colored::*;
use reqwest::{redirect, StatusCode};
use std::collections::BTreeMap;
use tokio::time::{sleep, Duration};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Pause between scripted requests so validation stays under the server's rate limit
const PACE: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "raffle-cli")]
#[command(about = "Raffle Server CLI", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health endpoint
    Health,

    /// Create a new room and print its id
    Create,

    /// Add an entry to a room
    Put {
        /// Room ID
        #[arg(short, long)]
        room_id: String,

        /// Entry text
        #[arg(short, long)]
        entry: String,
    },

    /// Show how many entries a room holds
    Count {
        /// Room ID
        #[arg(short, long)]
        room_id: String,
    },

    /// Draw a random entry from a room
    Draw {
        /// Room ID
        #[arg(short, long)]
        room_id: String,
    },

    /// Run automated validation scenarios
    Validate {
        /// Run all validation scenarios
        #[arg(short, long)]
        all: bool,

        /// Run a single scenario
        #[arg(short, long)]
        scenario: Option<String>,
    },
}

/// Thin HTTP client for the raffle API
struct RaffleClient {
    base_url: String,
    http: reqwest::Client,
}

impl RaffleClient {
    fn new(server: &str) -> CliResult<Self> {
        // Room creation answers with a redirect that carries the new id
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url: format!("http://{}", server),
            http,
        })
    }

    async fn health(&self) -> CliResult<serde_json::Value> {
        let resp = self.http.get(format!("{}/health", self.base_url)).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    async fn create(&self) -> CliResult<String> {
        let resp = self.http.get(format!("{}/api/create", self.base_url)).send().await?;
        if resp.status() != StatusCode::FOUND {
            return Err(format!("unexpected status {}", resp.status()).into());
        }

        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or("redirect without location")?;

        location
            .strip_prefix("/add/")
            .map(str::to_string)
            .ok_or_else(|| format!("unexpected redirect target {}", location).into())
    }

    /// Returns `false` when the server does not know the room
    async fn put(&self, room_id: &str, entry: &str) -> CliResult<bool> {
        let resp = self
            .http
            .post(format!("{}/api/put", self.base_url))
            .header("roomID", room_id)
            .header("entry", urlencoding::encode(entry).into_owned())
            .send()
            .await?;
        Self::found(resp.status())
    }

    async fn count(&self, room_id: &str) -> CliResult<Option<usize>> {
        let resp = self
            .http
            .get(format!("{}/api/count/{}", self.base_url, room_id))
            .send()
            .await?;
        if !Self::found(resp.status())? {
            return Ok(None);
        }
        Ok(Some(resp.text().await?.trim().parse()?))
    }

    /// `Some("")` means the room exists but is empty
    async fn draw(&self, room_id: &str) -> CliResult<Option<String>> {
        let resp = self
            .http
            .get(format!("{}/api/draw/{}", self.base_url, room_id))
            .send()
            .await?;
        if !Self::found(resp.status())? {
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }

    fn found(status: StatusCode) -> CliResult<bool> {
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::BAD_REQUEST => Ok(false),
            other => Err(format!("unexpected status {}", other).into()),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = match RaffleClient::new(&cli.server) {
        Ok(client) => client,
        Err(e) => {
            println!("{} Failed to build HTTP client: {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    match &cli.command {
        Commands::Health => check_health(&client, &cli.server).await,
        Commands::Create => create_room(&client).await,
        Commands::Put { room_id, entry } => put_entry(&client, room_id, entry).await,
        Commands::Count { room_id } => count_entries(&client, room_id).await,
        Commands::Draw { room_id } => draw_entry(&client, room_id).await,
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&client).await;
            } else if let Some(s) = scenario {
                run_scenario(&client, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
    }
}

async fn check_health(client: &RaffleClient, server: &str) {
    println!("{}", "Checking server health...".cyan());

    match client.health().await {
        Ok(body) => {
            println!("{} Health check passed", "✓".green());
            println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
            println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
            println!("  Rooms: {}", body["rooms"]);
        }
        Err(e) => {
            println!("{} Health check failed: {}", "✗".red(), e);
            println!("  Make sure the server is running on {}", server);
        }
    }
}

async fn create_room(client: &RaffleClient) {
    println!("{}", "Creating room...".cyan());

    match client.create().await {
        Ok(room_id) => {
            println!("{} Room created successfully!", "✓".green());
            println!("\n{}", "═".repeat(50).green());
            println!("{} {}", "Room ID:".bold(), room_id.green().bold());
            println!("{}", "═".repeat(50).green());
        }
        Err(e) => println!("{} Failed to create room: {}", "✗".red(), e),
    }
}

async fn put_entry(client: &RaffleClient, room_id: &str, entry: &str) {
    match client.put(room_id, entry).await {
        Ok(true) => println!("{} Added {:?}", "✓".green(), entry),
        Ok(false) => println!("{} Room {} not found", "✗".red(), room_id),
        Err(e) => println!("{} Request failed: {}", "✗".red(), e),
    }
}

async fn count_entries(client: &RaffleClient, room_id: &str) {
    match client.count(room_id).await {
        Ok(Some(count)) => println!("{} {} entries", "✓".green(), count.to_string().bold()),
        Ok(None) => println!("{} Room {} not found", "✗".red(), room_id),
        Err(e) => println!("{} Request failed: {}", "✗".red(), e),
    }
}

async fn draw_entry(client: &RaffleClient, room_id: &str) {
    match client.draw(room_id).await {
        Ok(Some(entry)) if entry.is_empty() => println!("{} Room is empty", "○".yellow()),
        Ok(Some(entry)) => println!("{} Drew {}", "✓".green(), entry.green().bold()),
        Ok(None) => println!("{} Room {} not found", "✗".red(), room_id),
        Err(e) => println!("{} Request failed: {}", "✗".red(), e),
    }
}

const SCENARIOS: &[(&str, &str)] = &[
    ("health", "Health endpoint responds"),
    ("create-room", "Room creation redirects to a fresh id"),
    ("count", "Count follows appends"),
    ("draw-all", "Draw every entry exactly once, then empty"),
    ("invalid-room", "Unknown rooms are rejected"),
];

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    for (name, description) in SCENARIOS {
        println!("  {} - {}", name.cyan(), description);
    }
    println!("\nExample: raffle-cli validate --scenario draw-all");
}

async fn run_named(client: &RaffleClient, scenario: &str) -> Option<bool> {
    let result = match scenario {
        "health" => validate_health(client).await,
        "create-room" => validate_create_room(client).await,
        "count" => validate_count(client).await,
        "draw-all" => validate_draw_all(client).await,
        "invalid-room" => validate_invalid_room(client).await,
        _ => return None,
    };
    Some(result)
}

async fn run_scenario(client: &RaffleClient, scenario: &str) {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    match run_named(client, scenario).await {
        Some(true) => println!("\n{} Scenario passed", "✓".green().bold()),
        Some(false) => println!("\n{} Scenario failed", "✗".red().bold()),
        None => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
        }
    }
}

async fn run_all_validations(client: &RaffleClient) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let mut passed = 0;
    let mut failed = 0;

    for (scenario, _) in SCENARIOS {
        println!("\n{} Testing: {}", "▶".cyan(), scenario.bold());
        println!("{}", "─".repeat(60));

        if run_named(client, scenario).await == Some(true) {
            passed += 1;
        } else {
            failed += 1;
        }
        sleep(PACE).await;
    }

    println!("\n{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed!".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

/// Prints the failure and turns the result into a pass/fail flag
fn check<T>(step: &str, result: CliResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            println!("{} {} failed: {}", "✗".red(), step, e);
            None
        }
    }
}

async fn validate_health(client: &RaffleClient) -> bool {
    match check("Health check", client.health().await) {
        Some(body) if body["status"] == "healthy" => {
            println!("{} Server healthy, {} rooms", "✓".green(), body["rooms"]);
            true
        }
        Some(body) => {
            println!("{} Unexpected health report: {}", "✗".yellow(), body);
            false
        }
        None => false,
    }
}

async fn validate_create_room(client: &RaffleClient) -> bool {
    let Some(room_id) = check("Create room", client.create().await) else {
        return false;
    };
    if room_id.len() != 32 || !room_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        println!("{} Malformed room id {:?}", "✗".red(), room_id);
        return false;
    }
    println!("{} Room created: {}", "✓".green(), room_id);

    sleep(PACE).await;
    match check("Count", client.count(&room_id).await) {
        Some(Some(0)) => {
            println!("{} New room is empty", "✓".green());
            true
        }
        other => {
            println!("{} Expected an empty room, got {:?}", "✗".red(), other);
            false
        }
    }
}

async fn validate_count(client: &RaffleClient) -> bool {
    let Some(room_id) = check("Create room", client.create().await) else {
        return false;
    };

    for n in 1..=3 {
        sleep(PACE).await;
        if check("Put", client.put(&room_id, &format!("entry {}", n)).await) != Some(true) {
            return false;
        }
        sleep(PACE).await;
        match check("Count", client.count(&room_id).await) {
            Some(Some(count)) if count == n => {
                println!("{} Count is {} after {} appends", "✓".green(), count, n);
            }
            other => {
                println!("{} Expected {}, got {:?}", "✗".red(), n, other);
                return false;
            }
        }
    }
    true
}

async fn validate_draw_all(client: &RaffleClient) -> bool {
    let Some(room_id) = check("Create room", client.create().await) else {
        return false;
    };

    let mut expected: BTreeMap<String, usize> = BTreeMap::new();
    for entry in ["cat", "dog", "fish"] {
        sleep(PACE).await;
        if check("Put", client.put(&room_id, entry).await) != Some(true) {
            return false;
        }
        *expected.entry(entry.to_string()).or_default() += 1;
    }
    println!("  Added cat, dog, fish to {}", room_id);

    let mut drawn: BTreeMap<String, usize> = BTreeMap::new();
    for _ in 0..3 {
        sleep(PACE).await;
        match check("Draw", client.draw(&room_id).await) {
            Some(Some(entry)) if !entry.is_empty() => {
                println!("  Drew {}", entry.green());
                *drawn.entry(entry).or_default() += 1;
            }
            other => {
                println!("{} Expected an entry, got {:?}", "✗".red(), other);
                return false;
            }
        }
    }

    if drawn != expected {
        println!("{} Drawn entries {:?} do not match {:?}", "✗".red(), drawn, expected);
        return false;
    }
    println!("{} Every entry drawn exactly once", "✓".green());

    sleep(PACE).await;
    if check("Count", client.count(&room_id).await) != Some(Some(0)) {
        println!("{} Room should be empty", "✗".red());
        return false;
    }

    sleep(PACE).await;
    match check("Draw", client.draw(&room_id).await) {
        Some(Some(entry)) if entry.is_empty() => {
            println!("{} Draw from empty room returns nothing", "✓".green());
            true
        }
        other => {
            println!("{} Expected an empty draw, got {:?}", "✗".red(), other);
            false
        }
    }
}

async fn validate_invalid_room(client: &RaffleClient) -> bool {
    let room_id = "ZZZZ";

    let put = check("Put", client.put(room_id, "ghost").await);
    sleep(PACE).await;
    let count = check("Count", client.count(room_id).await);
    sleep(PACE).await;
    let draw = check("Draw", client.draw(room_id).await);

    if put == Some(false) && count == Some(None) && draw == Some(None) {
        println!("{} Unknown room rejected by put, count and draw", "✓".green());
        true
    } else {
        println!(
            "{} Expected rejections, got put={:?} count={:?} draw={:?}",
            "✗".red(),
            put,
            count,
            draw
        );
        false
    }
}
