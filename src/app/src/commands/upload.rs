//! Firmware upload command definitions.
//!
//! These types define the interface between the Core and the Shell for the
//! multipart image transfer. `crux_http` buffers request bodies and cannot
//! report progress, so the shell streams the file itself and sends
//! `FirmwareEvent::UploadProgress` events while the transfer runs.

use crux_core::{capability::Operation, command, Command};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Multipart form field the device reads the image from
pub const UPLOAD_FIELD_NAME: &str = "update";

// Operations that the Shell needs to perform for an upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadOperation {
    Start {
        url: String,
        field_name: String,
        file_name: String,
    },
}

// The output from upload operations (shell tells us what happened)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadOutput {
    /// The device answered the request
    Completed { status: u16, body: String },
    /// The transfer broke off before the device answered
    ConnectionError { message: String },
}

impl Operation for UploadOperation {
    type Output = UploadOutput;
}

/// Command-based upload API
pub struct Upload<Effect, Event> {
    _effect: PhantomData<Effect>,
    _event: PhantomData<Event>,
}

impl<Effect, Event> Upload<Effect, Event>
where
    Effect: Send + From<crux_core::Request<UploadOperation>> + 'static,
    Event: Send + 'static,
{
    /// Stream the selected file to `url` as a multipart form
    pub fn start(
        url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> RequestBuilder<Effect, Event> {
        RequestBuilder::new(UploadOperation::Start {
            url: url.into(),
            field_name: UPLOAD_FIELD_NAME.to_string(),
            file_name: file_name.into(),
        })
    }
}

/// Request builder for upload operations
#[must_use]
pub struct RequestBuilder<Effect, Event> {
    operation: UploadOperation,
    _effect: PhantomData<Effect>,
    _event: PhantomData<fn() -> Event>,
}

impl<Effect, Event> RequestBuilder<Effect, Event>
where
    Effect: Send + From<crux_core::Request<UploadOperation>> + 'static,
    Event: Send + 'static,
{
    fn new(operation: UploadOperation) -> Self {
        Self {
            operation,
            _effect: PhantomData,
            _event: PhantomData,
        }
    }

    /// Build the request into a Command RequestBuilder
    pub fn build(
        self,
    ) -> command::RequestBuilder<Effect, Event, impl std::future::Future<Output = UploadOutput>>
    {
        command::RequestBuilder::new(move |ctx| async move {
            Command::request_from_shell(self.operation)
                .into_future(ctx)
                .await
        })
    }
}
