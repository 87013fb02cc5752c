//! JSON-RPC transport to a Bitcoin node.

use gbt_core::rpc::{parse_submit_response, RpcRequest, RpcResponse};
use gbt_core::Network;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};
use crate::miner::to_js_error;

/// Connection settings for the node.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// RPC endpoint. Defaults to localhost on the network's RPC port.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    "mainnet".to_string()
}

impl NodeConfig {
    /// Resolve the endpoint URL.
    pub fn endpoint(&self) -> Result<String, String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let network: Network = self
            .network
            .parse()
            .map_err(|_| format!("Invalid network: {}", self.network))?;
        Ok(network.default_rpc_url())
    }

    /// `user:password`, if credentials were given.
    pub fn credentials(&self) -> Option<String> {
        self.user.as_ref().map(|user| {
            format!("{}:{}", user, self.password.as_deref().unwrap_or_default())
        })
    }
}

/// Node RPC client.
#[wasm_bindgen]
pub struct NodeClient {
    endpoint: String,
    credentials: Option<String>,
}

#[wasm_bindgen]
impl NodeClient {
    /// Create a client from a `{ url, user, password, network }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<NodeClient, JsValue> {
        let config: NodeConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid node config: {}", e)))?;

        Ok(NodeClient {
            endpoint: config.endpoint().map_err(|e| JsValue::from_str(&e))?,
            credentials: config.credentials(),
        })
    }

    /// Fetch a template; returns the `result` object as JSON text,
    /// ready for `Miner.load_template`.
    pub async fn get_block_template(&self) -> Result<String, JsValue> {
        let body = self.call(&RpcRequest::get_block_template()).await?;
        let result = RpcResponse::from_json_str(&body)
            .and_then(RpcResponse::into_result)
            .map_err(to_js_error)?;
        serde_json::to_string(&result).map_err(to_js_error)
    }

    /// Submit a serialized block. Rejections come back as errors.
    pub async fn submit_block(&self, block_hex: &str) -> Result<(), JsValue> {
        let body = self.call(&RpcRequest::submit_block(block_hex)).await?;
        parse_submit_response(&body).map_err(to_js_error)
    }

    /// Get the endpoint URL.
    #[wasm_bindgen(getter)]
    pub fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    /// POST a request and return the raw response body.
    ///
    /// bitcoind answers RPC errors with HTTP 500 and a JSON error body,
    /// so the status is not checked here.
    async fn call(&self, request: &RpcRequest) -> Result<String, JsValue> {
        let payload = request.to_json().map_err(to_js_error)?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&JsValue::from_str(&payload));

        let http = Request::new_with_str_and_init(&self.endpoint, &opts)?;
        http.headers().set("Content-Type", "application/json")?;
        if let Some(credentials) = &self.credentials {
            let token = window.btoa(credentials)?;
            http.headers().set("Authorization", &format!("Basic {}", token))?;
        }

        let resp_value = JsFuture::from(window.fetch_with_request(&http)).await?;
        let resp: Response = resp_value.dyn_into()?;

        let text = JsFuture::from(resp.text()?).await?;
        text.as_string()
            .ok_or_else(|| JsValue::from_str("Response is not a string"))
    }
}
