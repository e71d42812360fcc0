use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use dontdrop_core::constants::TOP_PLAYERS_COUNT;
use dontdrop_core::SessionLog;
use leaderboard::{
    build_weekly_digest, replay_session, JsonFileStore, LeaderboardService, NoopScheduler,
    PlayerIdentity, SubmitOutcome,
};

const DEFAULT_STORE: &str = "dontdrop-store.json";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    println!("🏓 Don't Drop Leaderboard Admin");
    println!("{}", "=".repeat(70));
    println!();

    // Parse CLI arguments, pulling out `--store <path>` wherever it appears
    let mut args: Vec<String> = env::args().collect();
    let store_path = take_flag(&mut args, "--store").unwrap_or_else(|| DEFAULT_STORE.to_string());

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let command = args[1].clone();

    match command.as_str() {
        "top" => {
            let k = match args.get(2) {
                Some(raw) => raw.parse::<usize>().unwrap_or_else(|e| {
                    eprintln!("❌ Error: invalid count '{}': {}", raw, e);
                    std::process::exit(1);
                }),
                None => TOP_PLAYERS_COUNT,
            };
            top_command(&open_service(&store_path), k).await;
        }

        "submit" => {
            if args.len() < 5 {
                eprintln!("Usage: {} submit <stable_id> <display_name> <score> [--store <path>]", args[0]);
                std::process::exit(1);
            }
            let score = args[4].parse::<u64>().unwrap_or_else(|e| {
                eprintln!("❌ Error: invalid score '{}': {}", args[4], e);
                std::process::exit(1);
            });
            let player = PlayerIdentity::new(args[2].clone(), args[3].clone());
            submit_command(&open_service(&store_path), &player, score).await;
        }

        "clear" => {
            clear_command(&open_service(&store_path), &store_path).await;
        }

        "digest" => {
            digest_command(&open_service(&store_path)).await;
        }

        "replay" => {
            if args.len() < 3 {
                eprintln!("Usage: {} replay <session_log_file>", args[0]);
                eprintln!("Error: Missing required argument");
                std::process::exit(1);
            }
            replay_command(&args[2]);
        }

        "--help" | "-h" => {
            print_usage(&args[0]);
            std::process::exit(0);
        }

        _ => {
            eprintln!("❌ Unknown command: {}", command);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    if idx + 1 >= args.len() {
        eprintln!("❌ Error: {} requires a value", flag);
        std::process::exit(1);
    }
    let value = args.remove(idx + 1);
    args.remove(idx);
    Some(value)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [options] [--store <path>]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  top [k]");
    eprintln!("      Show the top k players (default {})", TOP_PLAYERS_COUNT);
    eprintln!();
    eprintln!("  submit <stable_id> <display_name> <score>");
    eprintln!("      Submit a score; only a new personal best is stored");
    eprintln!();
    eprintln!("  clear");
    eprintln!("      Delete the global leaderboard and all display names");
    eprintln!();
    eprintln!("  digest");
    eprintln!("      Print the weekly top-{} digest", TOP_PLAYERS_COUNT);
    eprintln!();
    eprintln!("  replay <session_log_file>");
    eprintln!("      Re-run a recorded session and check its claimed score");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --store <path>  JSON store snapshot (default: {})", DEFAULT_STORE);
}

fn open_service(store_path: &str) -> LeaderboardService {
    let store = JsonFileStore::open(store_path).unwrap_or_else(|e| {
        eprintln!("❌ Error opening store '{}': {}", store_path, e);
        std::process::exit(1);
    });
    LeaderboardService::new(Arc::new(store), Arc::new(NoopScheduler))
}

async fn top_command(service: &LeaderboardService, k: usize) {
    let snapshot = service.get_top_k(k).await.unwrap_or_else(|e| {
        eprintln!("❌ Error reading leaderboard: {}", e);
        std::process::exit(1);
    });

    println!("📋 Top {} players", k);
    println!();
    if snapshot.entries.is_empty() {
        println!("  (no scores yet)");
    }
    for entry in &snapshot.entries {
        println!(
            "  #{:<3} {:<24} {:>8}   [{}]",
            entry.rank, entry.display_name, entry.score, entry.stable_id
        );
    }
    println!("{}", "=".repeat(70));
}

async fn submit_command(service: &LeaderboardService, player: &PlayerIdentity, score: u64) {
    println!("📋 Submitting score");
    println!("  Player: {} ({})", player.display_name, player.stable_id);
    println!("  Score: {}", score);
    println!();

    match service.record_game_over(player, score).await {
        Ok(report) => {
            match report.outcome {
                SubmitOutcome::Updated => println!("✅ New personal best stored"),
                SubmitOutcome::NotHigher => println!(
                    "ℹ️  Not higher than the stored best ({})",
                    report.previous_best.unwrap_or_default()
                ),
            }
            if let Some(a) = report.announcement {
                println!("  Rank: {}", a.rank);
                if let Some(d) = a.displaced_player {
                    println!("  Displaced: {} ({} points)", d.display_name, d.score);
                }
            }
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!("❌ Submission failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn clear_command(service: &LeaderboardService, store_path: &str) {
    println!("⚠️  Clearing all leaderboard data in {}", store_path);
    match service.clear_all().await {
        Ok(identities) => {
            println!("✅ Leaderboard cleared ({} display names removed)", identities);
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!("❌ Error clearing leaderboard: {}", e);
            std::process::exit(1);
        }
    }
}

async fn digest_command(service: &LeaderboardService) {
    let digest = build_weekly_digest(service, chrono::Utc::now())
        .await
        .unwrap_or_else(|e| {
            eprintln!("❌ Error building digest: {}", e);
            std::process::exit(1);
        });
    println!("{}", digest.title());
    println!();
    println!("{}", digest.render());
    println!("{}", "=".repeat(70));
}

fn replay_command(log_file: &str) {
    println!("📋 Replaying session log");
    println!("  Log file: {}", log_file);
    println!();

    // Check file size before reading (DoS protection)
    const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10 MB
    let metadata = fs::metadata(log_file).unwrap_or_else(|e| {
        eprintln!("❌ Error accessing file '{}': {}", log_file, e);
        std::process::exit(1);
    });

    if metadata.len() > MAX_LOG_SIZE {
        eprintln!(
            "❌ Log file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_LOG_SIZE
        );
        std::process::exit(1);
    }

    let raw = fs::read_to_string(log_file).unwrap_or_else(|e| {
        eprintln!("❌ Error reading file '{}': {}", log_file, e);
        std::process::exit(1);
    });

    let log: SessionLog = serde_json::from_str(&raw).unwrap_or_else(|e| {
        eprintln!("❌ Error parsing JSON: {}", e);
        std::process::exit(1);
    });

    println!("📦 Loaded {} events from log", log.events.len());
    println!("  Session ID: {}", log.session_id);
    println!("  Claimed score: {}", log.claimed_score);
    println!();

    let start = Instant::now();
    match replay_session(&log) {
        Ok(report) => {
            println!("  Replay time: {:.2}s", start.elapsed().as_secs_f64());
            println!();
            println!("✅ Claimed score is supported by the replay");
            println!("  Replayed score: {}", report.replayed_score);
            println!(
                "  Hits: {} admitted, {} rejected",
                report.admitted_hits, report.rejected_hits
            );
            println!("  Log Hash: 0x{}", report.log_hash);
            println!("{}", "=".repeat(70));
        }
        Err(e) => {
            eprintln!();
            eprintln!("❌ Replay rejected: {}", e);
            eprintln!("{}", "=".repeat(70));
            std::process::exit(1);
        }
    }
}
