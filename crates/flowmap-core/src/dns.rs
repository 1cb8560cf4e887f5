use std::collections::BTreeMap;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Bounded worker pool for forward hostname resolution.
///
/// Lookups are independent, idempotent, and side-effect free; there is no
/// ordering requirement between them and no retry on failure. A lookup that
/// misses its timeout is abandoned: its worker finishes in the background and
/// the caller sees `None`. Inputs that already parse as IP addresses skip
/// resolution entirely.
#[derive(Debug, Clone)]
pub struct ResolverPool {
    pub workers: usize,
    pub timeout: Duration,
}

impl Default for ResolverPool {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ResolverPool {
    pub fn new(workers: usize, timeout: Duration) -> Self {
        Self {
            workers: workers.max(1),
            timeout,
        }
    }

    /// Resolve every host best-effort. The result map always contains one
    /// entry per distinct input; failures and timeouts degrade to `None`.
    pub fn resolve_all(&self, hosts: &[String]) -> BTreeMap<String, Option<IpAddr>> {
        let mut results: BTreeMap<String, Option<IpAddr>> = BTreeMap::new();
        let mut pending: Vec<String> = Vec::new();

        for host in hosts {
            let host = host.trim();
            if host.is_empty() {
                continue;
            }
            if let Ok(ip) = host.parse::<IpAddr>() {
                results.insert(host.to_string(), Some(ip));
            } else if !results.contains_key(host) {
                results.insert(host.to_string(), None);
                pending.push(host.to_string());
            }
        }

        if pending.is_empty() {
            return results;
        }

        let (job_tx, job_rx) = mpsc::channel::<String>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel::<(String, Option<IpAddr>)>();

        let workers = self.workers.min(pending.len());
        for _ in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            thread::spawn(move || loop {
                let host = match job_rx.lock() {
                    Ok(rx) => match rx.recv() {
                        Ok(host) => host,
                        Err(_) => break,
                    },
                    Err(_) => break,
                };
                let resolved = forward_lookup(&host);
                if result_tx.send((host, resolved)).is_err() {
                    break;
                }
            });
        }
        drop(result_tx);

        let total = pending.len();
        for host in pending {
            // Workers only exit when this sender drops, so send cannot fail.
            let _ = job_tx.send(host);
        }
        drop(job_tx);

        let mut received = 0usize;
        let mut deadline = Instant::now() + self.timeout;
        while received < total {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match result_rx.recv_timeout(remaining) {
                Ok((host, resolved)) => {
                    received += 1;
                    // Each answer restarts the per-call window.
                    deadline = Instant::now() + self.timeout;
                    results.insert(host, resolved);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        outstanding = total - received,
                        "dns lookups timed out; remaining hosts left unresolved"
                    );
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        results
    }
}

/// Best-effort forward lookup via the system resolver.
fn forward_lookup(host: &str) -> Option<IpAddr> {
    match (host, 0u16).to_socket_addrs() {
        Ok(mut addrs) => addrs.next().map(|sa| sa.ip()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_literals_bypass_resolution() {
        let pool = ResolverPool::new(2, Duration::from_millis(10));
        let out = pool.resolve_all(&["10.1.2.3".to_string(), "::1".to_string()]);
        assert_eq!(out["10.1.2.3"], Some("10.1.2.3".parse().unwrap()));
        assert_eq!(out["::1"], Some("::1".parse().unwrap()));
    }

    #[test]
    fn localhost_resolves() {
        let pool = ResolverPool::default();
        let out = pool.resolve_all(&["localhost".to_string()]);
        match out["localhost"] {
            Some(ip) => assert!(ip.is_loopback()),
            // Some sandboxes have no resolver at all; None is the documented
            // degradation, not a failure.
            None => {}
        }
    }

    #[test]
    fn every_input_gets_an_entry() {
        let pool = ResolverPool::new(4, Duration::from_millis(200));
        let hosts = vec![
            "definitely-not-a-real-host.invalid".to_string(),
            "192.0.2.1".to_string(),
        ];
        let out = pool.resolve_all(&hosts);
        assert_eq!(out.len(), 2);
        assert!(out.contains_key("definitely-not-a-real-host.invalid"));
        assert_eq!(out["192.0.2.1"], Some("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn empty_and_blank_inputs_are_ignored() {
        let pool = ResolverPool::new(1, Duration::from_millis(10));
        let out = pool.resolve_all(&["".to_string(), "   ".to_string()]);
        assert!(out.is_empty());
    }
}
