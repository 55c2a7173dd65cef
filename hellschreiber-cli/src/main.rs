mod app;
mod args;
mod commands;
mod files;

use std::fs::OpenOptions;

use clap::Parser;
pub use color_eyre::eyre::Error;
use tracing_subscriber::EnvFilter;

use crate::{
    app::App,
    args::{
        Args,
        Command,
    },
    files::AppFiles,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;

    let args = Args::parse();
    let app_files = AppFiles::new()?;

    if args.log_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
    else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_ansi(false)
            .with_writer(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(app_files.log_file())?,
            )
            .init();
    }

    tracing::info!("Starting hellschreiber-cli");
    tracing::debug!(?args);

    let settings = app_files.settings(args.config.as_deref())?;

    let result = match args.command {
        Command::Send {
            text,
            output,
            port,
            rts,
            dtr,
        } => {
            let mut settings = settings;
            if port.is_some() {
                settings.hell.ptt.port = port;
            }
            if rts || dtr {
                settings.hell.ptt.rts = rts;
                settings.hell.ptt.dtr = dtr;
            }

            let mut app = App::new(settings, &output, &text)?;
            app.run().await.map(|report| {
                println!(
                    "Sent {} characters in {:.2} s",
                    report.characters,
                    report.elapsed.as_secs_f32()
                );
            })
        }
        Command::Render {
            text,
            output,
            format,
            fonts,
            volume,
            no_markers,
        } => {
            commands::render(
                &settings,
                &text,
                &output,
                format.into(),
                &fonts,
                volume,
                no_markers,
            )
        }
        Command::Devices => commands::devices(&settings),
        Command::Ports => commands::ports(),
        Command::Show { table, characters } => commands::show(&settings, &table, &characters),
        Command::Convert(command) => commands::convert(command),
    };

    if let Err(error) = &result {
        tracing::error!(?error);
    }
    else {
        tracing::info!("Program exiting");
    }

    result
}
