use std::{thread, time::Duration};

use log::{debug, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};

use crate::{
    config::MqttConfig,
    domain::track::Track,
    publish::{PublishError, Publisher},
};

const DEFAULT_PORT: u16 = 1883;
const REQUEST_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Publishes each track as a JSON message on an MQTT topic.
///
/// Messages are queued on the client and sent by a background thread that
/// keeps the broker connection alive, reconnecting as needed.
pub struct MqttPublisher {
    client: Client,
    topic: String,
    qos: QoS,
    retain: bool,
}

impl MqttPublisher {
    pub fn connect(cfg: &MqttConfig) -> Result<Self, PublishError> {
        let broker = cfg.broker.as_deref().ok_or(PublishError::MissingBroker)?;
        let (host, port) = parse_broker(broker)?;
        if cfg.topic.is_empty() {
            return Err(PublishError::MissingTopic);
        }
        if cfg.client_id.trim().is_empty() || cfg.client_id.starts_with(' ') {
            return Err(PublishError::InvalidClientId(cfg.client_id.clone()));
        }
        let qos = qos(cfg.qos)?;

        let mut options = MqttOptions::new(cfg.client_id.clone(), host, port);
        options.set_keep_alive(Duration::from_secs(30));
        if let Some(username) = &cfg.username {
            options.set_credentials(username.clone(), cfg.password.clone().unwrap_or_default());
        }

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let address = broker.to_string();
        thread::spawn(move || drive(connection, &address));

        Ok(Self {
            client,
            topic: cfg.topic.clone(),
            qos,
            retain: cfg.retain,
        })
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, track: &Track) -> Result<(), PublishError> {
        let content = serde_json::to_vec(track)?;
        self.client
            .publish(self.topic.as_str(), self.qos, self.retain, content)?;

        debug!(
            "queued track '{}' by '{}' on topic {}",
            track.title, track.artist, self.topic
        );
        Ok(())
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        info!("stop mqtt connection");
        if let Err(e) = self.client.disconnect() {
            warn!("unable to disconnect from mqtt broker: {e}");
        }
    }
}

/// Runs the client event loop until the client disconnects or is dropped
fn drive(mut connection: Connection, broker: &str) {
    for event in connection.iter() {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("connected to mqtt broker {broker}"),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("mqtt connection to {broker} failed: {e}");
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    debug!("mqtt event loop of {broker} stopped");
}

/// Splits `tcp://host:port`, `mqtt://host:port`, `host:port` or `host`
fn parse_broker(broker: &str) -> Result<(String, u16), PublishError> {
    let invalid = || PublishError::InvalidBroker(broker.to_string());

    let address = ["tcp://", "mqtt://"]
        .iter()
        .find_map(|scheme| broker.strip_prefix(scheme))
        .unwrap_or(broker);
    if address.contains("://") {
        return Err(invalid());
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
        None => (address, DEFAULT_PORT),
    };
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

fn qos(level: u8) -> Result<QoS, PublishError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        _ => Err(PublishError::InvalidQos(level)),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        sync::mpsc,
    };

    use super::*;

    #[test]
    fn test_parse_broker() -> anyhow::Result<()> {
        let cases = [
            ("tcp://192.168.0.2:1883", ("192.168.0.2", 1883)),
            ("mqtt://broker.local:8883", ("broker.local", 8883)),
            ("broker.local:1884", ("broker.local", 1884)),
            ("broker.local", ("broker.local", DEFAULT_PORT)),
        ];

        for (broker, (host, port)) in cases {
            assert_eq!(parse_broker(broker)?, (host.to_string(), port), "{broker}");
        }
        for broker in ["ws://broker.local:80", "broker.local:port", ":1883", ""] {
            assert!(
                matches!(parse_broker(broker), Err(PublishError::InvalidBroker(_))),
                "{broker}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_qos() {
        assert_eq!(qos(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(qos(3), Err(PublishError::InvalidQos(3))));
    }

    #[test]
    fn test_connect_requires_broker_and_topic() {
        let mut cfg = MqttConfig::default();
        assert!(matches!(
            MqttPublisher::connect(&cfg),
            Err(PublishError::MissingBroker)
        ));

        cfg.broker = Some("127.0.0.1:1883".to_string());
        assert!(matches!(
            MqttPublisher::connect(&cfg),
            Err(PublishError::MissingTopic)
        ));

        cfg.topic = "music".to_string();
        cfg.client_id = " ".to_string();
        assert!(matches!(
            MqttPublisher::connect(&cfg),
            Err(PublishError::InvalidClientId(_))
        ));
    }

    /// Reads one MQTT control packet, returns its first header byte and body
    fn read_packet(stream: &mut TcpStream) -> std::io::Result<(u8, Vec<u8>)> {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte)?;
        let header = byte[0];

        let mut length = 0usize;
        let mut shift = 0;
        loop {
            stream.read_exact(&mut byte)?;
            length |= ((byte[0] & 0x7f) as usize) << shift;
            if byte[0] & 0x80 == 0 {
                break;
            }
            shift += 7;
        }

        let mut body = vec![0u8; length];
        stream.read_exact(&mut body)?;
        Ok((header, body))
    }

    #[test]
    fn test_publish_track_on_topic() -> anyhow::Result<()> {
        let broker = TcpListener::bind("127.0.0.1:0")?;
        let addr = broker.local_addr()?;
        let (sent, received) = mpsc::channel();
        thread::spawn(move || -> std::io::Result<()> {
            let (mut stream, _) = broker.accept()?;
            let (connect, _) = read_packet(&mut stream)?;
            assert_eq!(connect >> 4, 1);
            stream.write_all(&[0x20, 0x02, 0x00, 0x00])?;

            let (header, body) = read_packet(&mut stream)?;
            let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
            let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
            let payload = body[2 + topic_len..].to_vec();
            sent.send((header, topic, payload)).ok();
            Ok(())
        });

        let cfg = MqttConfig {
            broker: Some(format!("tcp://{addr}")),
            topic: "home/music/track".to_string(),
            retain: true,
            ..Default::default()
        };
        let track = Track {
            artist: "Air".into(),
            title: "La femme d'argent".into(),
            year: 1998,
            ..Default::default()
        };
        let mut publisher = MqttPublisher::connect(&cfg)?;

        publisher.publish(&track)?;

        let (header, topic, payload) = received.recv_timeout(Duration::from_secs(5))?;
        // PUBLISH, QoS 0, retained
        assert_eq!(header, 0x31);
        assert_eq!(topic, "home/music/track");
        assert_eq!(serde_json::from_slice::<Track>(&payload)?, track);
        Ok(())
    }
}
