use std::{fs::File, io::Read};

use anyhow::{anyhow, Result};
use api::{
    routes, Connections, FileTree, Graph, Reset, ResetResponse, RunScript, RunScriptResponse,
    SaveScript, SaveScriptResponse,
};
use reqwest::{
    blocking::{Client, ClientBuilder, RequestBuilder, Response},
    header::{HeaderValue, CONTENT_TYPE},
    Certificate, Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::to_string_pretty;

pub struct Api {
    host: String,
    client: Client,
}

impl Api {
    pub fn new(host: &str, cert_path: Option<&str>) -> Result<Api> {
        let mut builder = ClientBuilder::new().timeout(None);
        if let Some(cert_path) = cert_path {
            let cert = Certificate::from_pem(&read_file(cert_path)?)?;
            // Native tls, rustls does not accept certificates for IP addresses.
            builder = builder
                .tls_sni(false)
                .add_root_certificate(cert)
                .use_native_tls();
        }
        Ok(Api {
            host: host.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn get_connections(&self) -> Result<String> {
        let response = self.request(Method::GET, routes::CONNECTIONS).send()?;
        deserialize::<Connections>(response)
    }

    pub fn get_graph(&self) -> Result<String> {
        let response = self.request(Method::GET, routes::GRAPH).send()?;
        deserialize::<Graph>(response)
    }

    pub fn list_scripts(&self) -> Result<String> {
        let response = self.request(Method::GET, routes::SCRIPTS).send()?;
        deserialize::<FileTree>(response)
    }

    pub fn download(&self, script_path: &str) -> Result<String> {
        let response = self
            .request(Method::GET, routes::DOWNLOAD)
            .query(&[("scriptPath", script_path)])
            .send()?;
        if response.status().is_success() {
            Ok(response.text()?)
        } else {
            Ok(to_string_pretty(&response.json::<api::Error>()?)?)
        }
    }

    pub fn save(&self, id: String, full_path: String, file: &str) -> Result<String> {
        let script = String::from_utf8(read_file(file)?)?;
        let save = SaveScript {
            id,
            full_path,
            script,
        };
        let response = self.request_with_body(Method::POST, routes::SAVE, save)?.send()?;
        deserialize::<SaveScriptResponse>(response)
    }

    pub fn run(&self, id: String, full_path: String) -> Result<String> {
        let run = RunScript { id, full_path };
        let response = self.request_with_body(Method::POST, routes::RUN, run)?.send()?;
        deserialize::<RunScriptResponse>(response)
    }

    pub fn reset(&self, id: Option<String>) -> Result<String> {
        let response = self
            .request_with_body(Method::POST, routes::RESET, Reset { id })?
            .send()?;
        deserialize::<ResetResponse>(response)
    }

    fn request(&self, method: Method, route: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.host, route))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    fn request_with_body<T: Serialize>(
        &self,
        method: Method,
        route: &str,
        body: T,
    ) -> Result<RequestBuilder> {
        let body = serde_json::to_string(&body)?;
        Ok(self.request(method, route).body(body))
    }
}

fn deserialize<T: DeserializeOwned + Serialize>(response: Response) -> Result<String> {
    if response.status().is_success() {
        Ok(to_string_pretty(&response.json::<T>()?)?)
    } else {
        Ok(to_string_pretty(&response.json::<api::Error>()?)?)
    }
}

fn read_file(path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match File::open(path) {
        Ok(mut file) => match file.read_to_end(&mut buf) {
            Ok(_) => Ok(buf),
            Err(e) => Err(anyhow!("{}: {}", e, path)),
        },
        Err(e) => Err(anyhow!("{}: {}", e, path)),
    }
}
