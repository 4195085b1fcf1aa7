/// Macro for model field updates with automatic rendering.
///
/// Renders only when the value actually changed.
///
/// ```ignore
/// update_field!(model.error_message, None)
/// ```
#[macro_export]
macro_rules! update_field {
    ($model_field:expr, $value:expr) => {{
        let value = $value;
        if $model_field != value {
            $model_field = value;
            crux_core::render::render()
        } else {
            crux_core::Command::done()
        }
    }};
}

/// Macro for device GET requests with standard loading state and error handling.
///
/// NOTE: URLs are prefixed with `https://relative`.
/// `crux_http` requires absolute URLs and rejects relative paths.
/// Shells strip this prefix before sending requests.
///
/// # Patterns
///
/// Pattern 1: GET for its side effect (status only)
/// ```ignore
/// device_get!(Config, ConfigEvent, model, "/networkLoad?restart=1", RestartDeviceResponse, "Restart")
/// ```
///
/// Pattern 2: GET expecting JSON response
/// ```ignore
/// device_get!(Modbus, ModbusEvent, model, "/modbusLoad", Loaded, "Load Modbus setup",
///     expect_json: serde_json::Value
/// )
/// ```
///
/// Pattern 3: GET expecting a configuration snapshot, custom event mapping
/// ```ignore
/// device_get!(model, page.load_endpoint(), format!("Load {page}"),
///     snapshot: move |result| Event::Config(ConfigEvent::Loaded { page, result })
/// )
/// ```
#[macro_export]
macro_rules! device_get {
    // Pattern 1: GET for its side effect (status only)
    ($domain:ident, $domain_event:ident, $model:expr, $endpoint:expr, $response_event:ident, $action:expr) => {{
        $model.start_loading();
        crux_core::Command::all([
            crux_core::render::render(),
            $crate::HttpCmd::get($crate::build_url(&$endpoint))
                .build()
                .then_send(|result| {
                    let event_result = $crate::process_status_response($action, result);
                    $crate::events::Event::$domain($crate::events::$domain_event::$response_event(
                        event_result,
                    ))
                }),
        ])
    }};

    // Pattern 2: GET expecting JSON response
    ($domain:ident, $domain_event:ident, $model:expr, $endpoint:expr, $response_event:ident, $action:expr, expect_json: $response_type:ty) => {{
        $model.start_loading();
        crux_core::Command::all([
            crux_core::render::render(),
            $crate::HttpCmd::get($crate::build_url(&$endpoint))
                .build()
                .then_send(|result| {
                    let event_result: Result<$response_type, String> =
                        $crate::process_json_response($action, result);
                    $crate::events::Event::$domain($crate::events::$domain_event::$response_event(
                        event_result,
                    ))
                }),
        ])
    }};

    // Pattern 3: GET expecting a configuration snapshot, custom event mapping
    ($model:expr, $endpoint:expr, $action:expr, snapshot: $to_event:expr) => {{
        $model.start_loading();
        let action = $action;
        let to_event = $to_event;
        crux_core::Command::all([
            crux_core::render::render(),
            $crate::HttpCmd::get($crate::build_url(&$endpoint))
                .build()
                .then_send(move |result| {
                    to_event($crate::process_snapshot_response(&action, result))
                }),
        ])
    }};
}

/// Macro for device POST requests that persist a payload.
///
/// The body is encoded by the caller. The response is classified into a
/// `SaveOutcome` which is handed to the event mapping, so callers can tell
/// rejections from transport failures.
///
/// # Example
/// ```ignore
/// device_post!(model, "/modbus_setup", Encoding::Json, body: document,
///     outcome: |outcome| Event::Modbus(ModbusEvent::Persisted(outcome))
/// )
/// ```
#[macro_export]
macro_rules! device_post {
    ($model:expr, $endpoint:expr, $encoding:expr, body: $body:expr, outcome: $to_event:expr) => {{
        $model.start_loading();
        let to_event = $to_event;
        crux_core::Command::all([
            crux_core::render::render(),
            $crate::HttpCmd::post($crate::build_url(&$endpoint))
                .header("Content-Type", $encoding.content_type())
                .body_string($body)
                .build()
                .then_send(move |result| to_event($crate::process_save_response(result))),
        ])
    }};
}

/// Silent HTTP GET expecting JSON response.
/// Does not set loading state; used for background polling.
///
/// # Example
/// ```ignore
/// http_get!(Monitor, MonitorEvent, "/updateStatus", StatusResponse, DeviceStatus)
/// ```
#[macro_export]
macro_rules! http_get {
    ($domain:ident, $domain_event:ident, $endpoint:expr, $response_event:ident, $response_type:ty) => {
        $crate::HttpCmd::get($crate::build_url($endpoint))
            .build()
            .then_send(|result| {
                let event_result: Result<$response_type, String> =
                    $crate::process_json_response(stringify!($response_event), result);
                $crate::events::Event::$domain($crate::events::$domain_event::$response_event(
                    event_result,
                ))
            })
    };
}

/// Macro for handling response events with standard loading state and error handling.
///
/// # Patterns
///
/// Pattern 1: Only success message (for `Result<(), String>`)
/// ```ignore
/// handle_response!(model, result, {
///     success_message: "Operation successful",
/// })
/// ```
///
/// Pattern 2: Custom success handler without loading state (for polled responses)
/// ```ignore
/// handle_response!(model, result, {
///     on_success: |m, status| {
///         m.device_status = Some(status);
///     },
///     no_loading: true,
/// })
/// ```
#[macro_export]
macro_rules! handle_response {
    // Pattern 1: Only success message (for Result<(), String>)
    ($model:expr, $result:expr, {
        success_message: $msg:expr $(,)?
    }) => {{
        $model.stop_loading();
        match $result {
            Ok(()) => {
                $model.success_message = Some($msg.to_string());
            }
            Err(e) => {
                $model.set_error(e);
            }
        }
        crux_core::render::render()
    }};

    // Pattern 2: on_success without loading state; failures are logged
    ($model:expr, $result:expr, {
        on_success: |$success_model:ident, $value:tt| $success_body:block,
        no_loading: true $(,)?
    }) => {{
        match $result {
            Ok($value) => {
                #[allow(clippy::redundant_locals)]
                let $success_model = $model;
                $success_body
                crux_core::render::render()
            }
            Err(e) => {
                log::warn!("{e}");
                crux_core::Command::done()
            }
        }
    }};
}
