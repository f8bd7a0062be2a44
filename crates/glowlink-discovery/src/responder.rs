//! Device-side discovery responder
//!
//! Answers `ESP_LED_DISCOVERY` datagrams with a JSON announcement, the way
//! device firmware does. Used by loopback tests and the CLI's `respond`
//! command; it is not a firmware replacement.

use crate::error::Result;
use glowlink_core::{Announcement, DISCOVERY_REQUEST};
use glowlink_transport::{TransportEvent, UdpEndpoint};
use std::net::SocketAddr;
use tracing::{debug, info};

pub struct Responder {
    endpoint: UdpEndpoint,
    announcement: Announcement,
}

impl Responder {
    /// Bind the well-known (or any) port and prepare to answer with the
    /// given announcement
    pub async fn bind(port: u16, announcement: Announcement) -> Result<Self> {
        let endpoint = UdpEndpoint::bind(&format!("0.0.0.0:{port}")).await?;
        info!(
            "discovery responder on {:?} as {:?}",
            endpoint.local_addr().ok(),
            announcement.name
        );
        Ok(Self {
            endpoint,
            announcement,
        })
    }

    /// An announcement named after this host, for demos
    pub fn host_announcement() -> Announcement {
        let name = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "glowlink-device".to_string());
        Announcement::new(name.clone(), name)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Answer discovery requests until the endpoint is dropped. Anything
    /// that is not the exact request literal is ignored.
    pub async fn run(&self) -> Result<()> {
        let mut receiver = self.endpoint.start_receiver();
        let response = self.announcement.to_json();

        while let Some((event, from)) = receiver.recv_from().await {
            if let TransportEvent::Data(data) = event {
                if data.as_ref() == DISCOVERY_REQUEST {
                    debug!("discovery request from {}", from);
                    let _ = self.endpoint.send_to(&response, from).await;
                }
            }
        }

        Ok(())
    }
}
