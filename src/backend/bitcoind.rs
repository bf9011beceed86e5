use {
    super::*,
    bitcoind_async_client::{Auth, Client, error::ClientError},
};

/// Bitcoin Core over JSON-RPC.
pub struct BitcoinRpc {
    client: Client,
    network: Network,
}

impl BitcoinRpc {
    const BACKEND: &'static str = "bitcoind";

    pub fn new(
        url: Url,
        auth: Auth,
        network: Network,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::new(url.to_string(), auth, None, None, Some(timeout.as_secs()))
            .map_err(|source| BackendError::Bitcoind { source })?;

        Ok(Self { client, network })
    }

    fn rules(&self) -> Vec<&'static str> {
        let mut rules = vec!["segwit"];
        if self.network == Network::Signet {
            rules.push("signet");
        }
        rules
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, BackendError> {
        debug!("{} RPC {method}", Self::BACKEND);

        self.client
            .call_raw::<Value>(method, params)
            .await
            .map_err(backend_error)
    }
}

fn backend_error(source: ClientError) -> BackendError {
    match source {
        ClientError::Connection(_) => BackendError::ConnectionRefused {
            backend: BitcoinRpc::BACKEND,
        },
        source => BackendError::Bitcoind { source },
    }
}

#[async_trait]
impl PrimaryBackend for BitcoinRpc {
    async fn get_template(&self) -> Result<Value, BackendError> {
        self.call(
            "getblocktemplate",
            &[json!({
                "capabilities": ["coinbasetxn", "workid", "coinbase/append"],
                "rules": self.rules(),
            })],
        )
        .await
    }

    async fn submit_block(&self, block_hex: String) -> Result<bool, BackendError> {
        let result = self.call("submitblock", &[json!(block_hex)]).await?;

        if !result.is_null() {
            warn!("bitcoind rejected block: {result}");
        }

        Ok(result.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(network: Network) -> BitcoinRpc {
        BitcoinRpc::new(
            "http://127.0.0.1:8332".parse().unwrap(),
            Auth::UserPass("user".into(), "pass".into()),
            network,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn signet_rule() {
        assert_eq!(rpc(Network::Bitcoin).rules(), ["segwit"]);
        assert_eq!(rpc(Network::Signet).rules(), ["segwit", "signet"]);
    }

    #[test]
    fn connection_errors_are_connection_refused() {
        assert!(backend_error(ClientError::Connection("refused".into())).is_connection_refused());
    }
}
