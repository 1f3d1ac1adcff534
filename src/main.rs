//! WebGAL APK Builder - packages WebGAL games as Android APKs.

use std::process;
use webgal_apk_builder::cli;
use webgal_apk_builder::cli::OutputManager;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    eprintln!("    • {suggestion}");
                }
            }

            process::exit(1);
        }
    }
}
