use super::build_reply;
use hickory_proto::op::{Message, ResponseCode};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct Zone {
    records: HashMap<String, (Vec<Ipv4Addr>, u32)>,
    silent: bool,
}

/// In-process UDP DNS server answering A queries from a small zone.
///
/// Unknown names get NXDOMAIN. In silent mode nothing is answered.
pub struct MockDnsServer {
    addr: SocketAddr,
    zone: Arc<Mutex<Zone>>,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    /// Starts on an ephemeral loopback port.
    pub async fn start() -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = socket.local_addr()?;
        let zone = Arc::new(Mutex::new(Zone::default()));
        let queries = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task_zone = Arc::clone(&zone);
        let task_queries = Arc::clone(&queries);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { continue };
                        task_queries.fetch_add(1, Ordering::SeqCst);
                        let zone = task_zone.lock().unwrap().clone();
                        if zone.silent {
                            continue;
                        }
                        if let Some(reply) = Self::answer(&zone, &buf[..len]) {
                            let _ = socket.send_to(&reply, peer).await;
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            zone,
            queries,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn set_record(&self, name: &str, ips: &[&str], ttl: u32) {
        let ips = ips.iter().map(|s| s.parse().unwrap()).collect();
        self.zone
            .lock()
            .unwrap()
            .records
            .insert(name.to_ascii_lowercase(), (ips, ttl));
    }

    pub fn set_silent(&self, silent: bool) {
        self.zone.lock().unwrap().silent = silent;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn answer(zone: &Zone, packet: &[u8]) -> Option<Vec<u8>> {
        let query = Message::from_vec(packet).ok()?;
        let name = query.queries().first()?.name().to_ascii().to_ascii_lowercase();
        Some(match zone.records.get(&name) {
            Some((ips, ttl)) => build_reply(&query, ResponseCode::NoError, ips, *ttl),
            None => build_reply(&query, ResponseCode::NXDomain, &[], 0),
        })
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
