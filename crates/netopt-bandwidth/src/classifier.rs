//! Flow classification by application category

use netopt_common::{FlowDescriptor, TrafficCategory, TransportProtocol};

/// Maps flow descriptors to traffic categories
///
/// Application labels from the collector win; port/protocol heuristics
/// cover unlabeled flows.
#[derive(Debug, Default)]
pub struct FlowClassifier;

impl FlowClassifier {
    /// Create a classifier
    pub fn new() -> Self {
        Self
    }

    /// Classify a flow
    pub fn classify(&self, flow: &FlowDescriptor) -> TrafficCategory {
        if let Some(label) = &flow.application {
            if let Some(category) = Self::by_label(label) {
                return category;
            }
        }
        Self::by_port(flow.port, flow.protocol)
    }

    fn by_label(label: &str) -> Option<TrafficCategory> {
        let label = label.to_ascii_lowercase();
        let matches = |names: &[&str]| names.iter().any(|n| label.contains(n));

        if matches(&["sip", "rtp", "voip", "whatsapp-call", "facetime"]) {
            Some(TrafficCategory::Voice)
        } else if matches(&["zoom", "teams", "meet", "webex", "webrtc"]) {
            Some(TrafficCategory::Video)
        } else if matches(&["netflix", "youtube", "hulu", "twitch", "spotify", "hls", "dash"]) {
            Some(TrafficCategory::Streaming)
        } else if matches(&["steam", "xbox", "psn", "riot", "fortnite", "game"]) {
            Some(TrafficCategory::Gaming)
        } else if matches(&["http", "browser", "web"]) {
            Some(TrafficCategory::Browsing)
        } else if matches(&["ftp", "sftp", "rsync", "scp", "torrent", "s3", "backup"]) {
            Some(TrafficCategory::FileTransfer)
        } else if matches(&["slack", "xmpp", "irc", "signal", "telegram", "imap", "smtp"]) {
            Some(TrafficCategory::Messaging)
        } else if matches(&["update", "sync", "telemetry", "apt", "yum"]) {
            Some(TrafficCategory::Background)
        } else {
            None
        }
    }

    fn by_port(port: u16, protocol: TransportProtocol) -> TrafficCategory {
        match (port, protocol) {
            (5060 | 5061, _) => TrafficCategory::Voice,
            // RTP media range
            (16384..=32767, TransportProtocol::Udp) => TrafficCategory::Voice,
            // STUN/TURN used by conferencing
            (3478..=3481, _) => TrafficCategory::Video,
            (1935, _) => TrafficCategory::Streaming,
            (554, _) => TrafficCategory::Streaming,
            (3074, _) | (27015..=27030, _) => TrafficCategory::Gaming,
            (80 | 8080, TransportProtocol::Tcp) => TrafficCategory::Browsing,
            (443, TransportProtocol::Tcp) => TrafficCategory::Browsing,
            // QUIC on 443 is dominated by media delivery
            (443, TransportProtocol::Quic) => TrafficCategory::Streaming,
            (20 | 21 | 22 | 873, TransportProtocol::Tcp) => TrafficCategory::FileTransfer,
            (6881..=6889, _) => TrafficCategory::FileTransfer,
            (25 | 587 | 993 | 5222, TransportProtocol::Tcp) => TrafficCategory::Messaging,
            _ => TrafficCategory::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(application: Option<&str>, port: u16, protocol: TransportProtocol) -> FlowDescriptor {
        FlowDescriptor {
            id: "f1".into(),
            application: application.map(String::from),
            port,
            protocol,
            current_rate_mbps: 1.0,
        }
    }

    #[test]
    fn label_beats_port() {
        let c = FlowClassifier::new();
        // Port says browsing, label says conferencing
        let f = flow(Some("Zoom Meetings"), 443, TransportProtocol::Tcp);
        assert_eq!(c.classify(&f), TrafficCategory::Video);
    }

    #[test]
    fn port_heuristics() {
        let c = FlowClassifier::new();
        assert_eq!(
            c.classify(&flow(None, 5060, TransportProtocol::Udp)),
            TrafficCategory::Voice
        );
        assert_eq!(
            c.classify(&flow(None, 443, TransportProtocol::Tcp)),
            TrafficCategory::Browsing
        );
        assert_eq!(
            c.classify(&flow(None, 443, TransportProtocol::Quic)),
            TrafficCategory::Streaming
        );
        assert_eq!(
            c.classify(&flow(None, 22, TransportProtocol::Tcp)),
            TrafficCategory::FileTransfer
        );
    }

    #[test]
    fn unknown_falls_through() {
        let c = FlowClassifier::new();
        assert_eq!(
            c.classify(&flow(None, 49152, TransportProtocol::Tcp)),
            TrafficCategory::Unknown
        );
    }
}
