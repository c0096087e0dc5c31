use clap::error::ErrorKind;
use clap::Parser;
use holdings_etl::utils::{logger, validation::Validate};
use holdings_etl::{CliConfig, EtlEngine, EtlError, HoldingsPipeline, LocalStorage};

const USAGE: &str = "\
Usage:
  holdings-etl <file.mrc> <apiKey> [OPTIONS]
Where:
  file.mrc          Binary MARC21 export of items
  APIKEY            API key for accessing Alma REST APIs
Run with --help for options.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match CliConfig::try_parse() {
        Ok(config) => config,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", USAGE);
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }
    if config.verbose {
        tracing::debug!("CLI config: input={} config={:?}", config.input, config.config);
    }

    // 啟動時的錯誤一律中止，不產生任何輸出
    let run_config = match config.resolve().and_then(|c| c.validate().map(|_| c)) {
        Ok(run_config) => run_config,
        Err(e) => exit_with(e),
    };

    let storage = LocalStorage::new(".");
    let pipeline = match HoldingsPipeline::from_config(storage, run_config) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(e),
    };

    let engine = EtlEngine::new_with_monitoring(pipeline, config.monitor);
    match engine.run().await {
        Ok(report) => {
            tracing::info!(
                "✅ {} of {} holding record(s) exported",
                report.records_written,
                report.records_retrieved
            );
            println!("📁 Output saved to: {}", report.output_path);
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: EtlError) -> ! {
    tracing::error!(
        "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(1);
}
