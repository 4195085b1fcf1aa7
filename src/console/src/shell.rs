//! Effect loop executing core requests against the device

use anyhow::{Context, Result};
use crux_core::Core;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use crux_http::HttpError;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use iocontrol_ui_core::{
    App, Effect, Event, FirmwareEvent, Model, UploadOperation, UploadOutput, BASE_URL,
};
use reqwest::multipart::{Form, Part};
use std::{collections::VecDeque, path::PathBuf};
use tokio::sync::mpsc;

use crate::config::ConsoleConfig;

const UPLOAD_CHUNK_SIZE: usize = 4096;

/// Map an address built by the core onto the configured device
pub fn resolve_url(device_url: &str, core_url: &str) -> Result<String> {
    let path = core_url
        .strip_prefix(BASE_URL)
        .with_context(|| format!("unexpected request address {core_url}"))?;
    Ok(format!("{}{path}", device_url.trim_end_matches('/')))
}

pub struct Shell {
    core: Core<App>,
    client: reqwest::Client,
    config: ConsoleConfig,
    upload_path: Option<PathBuf>,
}

impl Shell {
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.http_timeout)
            .build()
            .context("failed to create http client")?;

        Ok(Self {
            core: Core::new(),
            client,
            config,
            upload_path: None,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn model(&self) -> Model {
        self.core.view()
    }

    /// File streamed by the next upload request
    pub fn set_upload_path(&mut self, path: PathBuf) {
        self.upload_path = Some(path);
    }

    /// Process an event and run every effect it causes until the core is idle
    pub async fn dispatch(&mut self, event: Event) -> Result<Model> {
        let effects = self.core.process_event(event);
        self.run(effects).await?;
        Ok(self.core.view())
    }

    async fn run(&mut self, effects: Vec<Effect>) -> Result<()> {
        let mut queue = VecDeque::from(effects);

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => log::trace!("render"),
                Effect::Http(mut request) => {
                    let result = self.execute_http(&request.operation).await;
                    let effects = self
                        .core
                        .resolve(&mut request, result)
                        .context("failed to resolve http request")?;
                    queue.extend(effects);
                }
                Effect::Upload(mut request) => {
                    let (output, effects) = self.execute_upload(&request.operation).await;
                    queue.extend(effects);
                    let effects = self
                        .core
                        .resolve(&mut request, output)
                        .context("failed to resolve upload request")?;
                    queue.extend(effects);
                }
            }
        }

        Ok(())
    }

    async fn execute_http(&self, request: &HttpRequest) -> HttpResult {
        match self.send(request).await {
            Ok(response) => HttpResult::Ok(response),
            Err(e) => {
                log::debug!("{} {} failed: {e:#}", request.method, request.url);
                HttpResult::Err(HttpError::Io(format!("{e:#}")))
            }
        }
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = resolve_url(&self.config.device_url, &request.url)?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("invalid method {}", request.method))?;

        log::debug!("{method} {url}");

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(self.config.http_timeout);
        for header in &request.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .context("failed to read response body")?;

        log::debug!("{url} answered {status}");

        Ok(HttpResponse::status(status).body(body.to_vec()).build())
    }

    /// Stream the selected file and feed progress reports back into the core.
    ///
    /// Returns the upload result together with the effects caused by the
    /// progress events.
    async fn execute_upload(&self, operation: &UploadOperation) -> (UploadOutput, Vec<Effect>) {
        let UploadOperation::Start {
            url,
            field_name,
            file_name,
        } = operation;

        let data = match self.read_upload_file().await {
            Ok(data) => data,
            Err(e) => {
                return (
                    UploadOutput::ConnectionError {
                        message: format!("{e:#}"),
                    },
                    Vec::new(),
                )
            }
        };
        let url = match resolve_url(&self.config.device_url, url) {
            Ok(url) => url,
            Err(e) => {
                return (
                    UploadOutput::ConnectionError {
                        message: format!("{e:#}"),
                    },
                    Vec::new(),
                )
            }
        };

        let progress_bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}% {msg}")
        {
            progress_bar.set_style(style.progress_chars("=>-"));
        }
        progress_bar.set_message(file_name.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let upload = send_multipart(
            self.client.clone(),
            url,
            field_name.clone(),
            file_name.clone(),
            data,
            tx,
        );
        tokio::pin!(upload);

        let mut effects = Vec::new();
        let output = loop {
            tokio::select! {
                output = &mut upload => break output,
                Some((loaded, total)) = rx.recv() => {
                    effects.extend(self.report_progress(loaded, total, &progress_bar));
                }
            }
        };
        while let Ok((loaded, total)) = rx.try_recv() {
            effects.extend(self.report_progress(loaded, total, &progress_bar));
        }

        progress_bar.finish_and_clear();
        (output, effects)
    }

    fn report_progress(&self, loaded: u64, total: u64, bar: &ProgressBar) -> Vec<Effect> {
        let effects = self
            .core
            .process_event(Event::Firmware(FirmwareEvent::UploadProgress { loaded, total }));
        if let Some(progress) = self.core.view().upload.progress() {
            bar.set_position(u64::from(progress));
        }
        effects
    }

    async fn read_upload_file(&self) -> Result<Vec<u8>> {
        let path = self.upload_path.as_ref().context("no file selected")?;
        tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

async fn send_multipart(
    client: reqwest::Client,
    url: String,
    field_name: String,
    file_name: String,
    data: Vec<u8>,
    progress: mpsc::UnboundedSender<(u64, u64)>,
) -> UploadOutput {
    let total = data.len() as u64;
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = data
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();

    let mut loaded = 0;
    let stream = futures_util::stream::iter(chunks).inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            loaded += chunk.len() as u64;
            let _ = progress.send((loaded, total));
        }
    });

    let part = match Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
        .file_name(file_name)
        .mime_str("application/octet-stream")
    {
        Ok(part) => part,
        Err(e) => {
            return UploadOutput::ConnectionError {
                message: e.to_string(),
            }
        }
    };

    log::debug!("POST {url} ({total} bytes)");

    match client
        .post(&url)
        .multipart(Form::new().part(field_name, part))
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            UploadOutput::Completed { status, body }
        }
        Err(e) => UploadOutput::ConnectionError {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_addresses_resolve_against_device() {
        assert_eq!(
            resolve_url("http://192.168.4.1", "https://relative/analogLoad?input=2").unwrap(),
            "http://192.168.4.1/analogLoad?input=2"
        );
        assert_eq!(
            resolve_url("http://controller.local/", "https://relative/").unwrap(),
            "http://controller.local/"
        );
    }

    #[test]
    fn foreign_addresses_are_rejected() {
        assert!(resolve_url("http://192.168.4.1", "https://example.com/update").is_err());
    }
}
