use std::any::Any;

use axum::{body::Body, http::StatusCode, response::Response};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use super::status_text_response;
use crate::metrics::Metrics;

/// Turns a panic in the downstream chain into a plain `500 Internal Server Error`.
///
/// The panic payload is logged here; the backtrace is logged by the hook from
/// [`install_panic_hook`], which runs before unwinding starts.
#[derive(Clone)]
pub struct PanicResponder {
    metrics: Metrics,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Self::ResponseBody> {
        self.metrics.inc_panics_recovered();
        tracing::error!("500: We have encountered an error with the last request.");
        tracing::error!("500: Error: {}", panic_detail(err.as_ref()));
        status_text_response(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub fn recovery_layer(metrics: Metrics) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder { metrics })
}

pub fn panic_detail(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Routes panic messages and a captured backtrace into the tracing sink.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("panic: {}\n{}", info, backtrace);
    }));
}
