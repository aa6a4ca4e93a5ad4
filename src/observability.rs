use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("companion.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("companion.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("companion.client.request_duration_seconds");

pub(crate) static SESSION_LOGINS: Counter = Counter::new("companion.session.logins");
pub(crate) static SESSION_LOGOUTS: Counter = Counter::new("companion.session.logouts");
pub(crate) static SESSION_AUTH_REJECTIONS: Counter =
    Counter::new("companion.session.auth_rejections");
pub(crate) static SESSION_STALE_RESPONSES: Counter =
    Counter::new("companion.session.stale_responses");
pub(crate) static SESSION_CANCELLED: Counter = Counter::new("companion.session.cancelled");

pub(crate) static CHAT_SENDS: Counter = Counter::new("companion.chat.sends");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("companion.chat.send_failures");
pub(crate) static CHAT_BUSY_REJECTIONS: Counter = Counter::new("companion.chat.busy_rejections");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_LOGINS);
    collector.register_counter(&SESSION_LOGOUTS);
    collector.register_counter(&SESSION_AUTH_REJECTIONS);
    collector.register_counter(&SESSION_STALE_RESPONSES);
    collector.register_counter(&SESSION_CANCELLED);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&CHAT_BUSY_REJECTIONS);
}
