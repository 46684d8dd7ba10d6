use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, error, info};
use std::{path::PathBuf, sync::Arc, thread};

use crate::config::{Config, MqttConfig};
use crate::domain::player::PlayerId;
use crate::publish::{JsonPublisher, PublishError, Publisher, mqtt::MqttPublisher};
use crate::squeeze::server::Server;

#[derive(Parser)]
#[command(name = "lmsbridge")]
#[command(version = "0.1")]
#[command(about = "Publish the tracks played on a squeezebox server")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Squeezebox server address, overrides the config file
    #[arg(short, long)]
    pub address: Option<String>,

    /// Display debug logs
    #[arg(short, long)]
    pub debug: bool,

    #[command(flatten)]
    pub mqtt: MqttArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Broker settings, override the `[mqtt]` section of the config file
#[derive(Args)]
pub struct MqttArgs {
    /// MQTT broker tracks are published to, e.g. tcp://127.0.0.1:1883
    #[arg(long)]
    pub mqtt_broker: Option<String>,

    #[arg(long)]
    pub mqtt_client_id: Option<String>,

    /// Topic tracks are published on
    #[arg(long)]
    pub mqtt_topic: Option<String>,

    /// Quality of service: 0, 1 or 2
    #[arg(long)]
    pub mqtt_qos: Option<u8>,

    /// Retain the last published track on the broker
    #[arg(long)]
    pub mqtt_retain: bool,
}

impl MqttArgs {
    fn apply(self, cfg: &mut MqttConfig) {
        if let Some(broker) = self.mqtt_broker {
            cfg.broker = Some(broker);
        }
        if let Some(client_id) = self.mqtt_client_id {
            cfg.client_id = client_id;
        }
        if let Some(topic) = self.mqtt_topic {
            cfg.topic = topic;
        }
        if let Some(qos) = self.mqtt_qos {
            cfg.qos = qos;
        }
        cfg.retain |= self.mqtt_retain;
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish the track of every player each time its song changes
    Listen,
    /// Print the track currently played by a player
    Current {
        /// Player id, as sent by the server
        #[arg(short, long)]
        player: String,
    },
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(address) = cli.address {
        cfg.server.address = address;
    }
    cli.mqtt.apply(&mut cfg.mqtt);

    init_logging(cfg.logging.level_filter(cli.debug)?);

    match cli.command {
        Commands::Listen => listen(cfg),
        Commands::Current { player } => {
            let server = Server::new(cfg.server, cfg.channel);
            let track = server
                .current_track(&PlayerId::from(player))
                .with_context(|| "Failed to read current track")?;

            let mut publisher = JsonPublisher::new(std::io::stdout(), true);
            publisher.publish(&track)?;
            Ok(())
        }
    }
}

fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

/// Runs the listener on its own thread and publishes tracks until the server
/// connection ends
fn listen(cfg: Config) -> anyhow::Result<()> {
    let mut publisher = publisher(&cfg).with_context(|| "Failed to open publish destination")?;

    let server = Arc::new(Server::new(cfg.server, cfg.channel));
    let tracks = server
        .tracks()
        .with_context(|| "Track stream already taken")?;

    let listener = {
        let server = server.clone();
        thread::spawn(move || {
            let result = server.listen();
            server.close();
            result
        })
    };

    for track in tracks.iter() {
        if let Err(e) = publisher.publish(&track) {
            error!("unable to publish track {track:?}: {e}");
        }
    }

    match listener.join() {
        Ok(result) => {
            result.with_context(|| format!("Lost connection to {}", server.config.address))?;
            info!("server {} closed the connection", server.config.address);
            Ok(())
        }
        Err(_) => anyhow::bail!("listener thread panicked"),
    }
}

/// MQTT when a broker is configured, JSON lines otherwise
fn publisher(cfg: &Config) -> Result<Box<dyn Publisher>, PublishError> {
    match cfg.mqtt.broker {
        Some(_) => Ok(Box::new(MqttPublisher::connect(&cfg.mqtt)?)),
        None => Ok(Box::new(JsonPublisher::open(
            cfg.publish.path.as_deref(),
            cfg.publish.pretty,
        )?)),
    }
}
