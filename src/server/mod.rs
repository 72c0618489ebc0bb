pub mod api;

use crate::cli::Args;
use crate::service::ChatService;
use api::AppState;
use log::error;
use std::error::Error;

pub struct Server {
    addr: String,
    service: ChatService,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        service: ChatService,
        args: Args,
    ) -> Self {
        Self {
            addr,
            service,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tls = self.tls_paths()?;
        let state = AppState::new(self.service.clone(), self.args.rate_limit_per_sec);
        api::start_http_server(&self.addr, state, tls).await
    }

    fn tls_paths(&self) -> Result<Option<(String, String)>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            return Ok(None);
        }
        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Some((cert_path.clone(), key_path.clone()))),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryMessageStore;
    use crate::service::RequestLimits;
    use clap::Parser;
    use std::sync::Arc;

    fn server(flags: &[&str]) -> Server {
        let args = Args::try_parse_from(flags).unwrap();
        let service = ChatService::new(Arc::new(MemoryMessageStore::default()), RequestLimits::default());
        Server::new(args.server_addr.clone(), service, args)
    }

    #[test]
    fn tls_disabled_by_default() {
        assert!(server(&["pairchat"]).tls_paths().unwrap().is_none());
    }

    #[test]
    fn tls_requires_both_paths() {
        assert!(server(&["pairchat", "--enable-tls", "--tls-cert-path", "c.pem"]).tls_paths().is_err());
        assert!(server(&["pairchat", "--enable-tls"]).tls_paths().is_err());
        let paths = server(&[
            "pairchat",
            "--enable-tls",
            "--tls-cert-path",
            "c.pem",
            "--tls-key-path",
            "k.pem",
        ])
            .tls_paths()
            .unwrap();
        assert_eq!(paths, Some(("c.pem".to_string(), "k.pem".to_string())));
    }
}
