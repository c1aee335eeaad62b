use tracing::{debug, error, info, trace, warn};

/// Context information for log messages
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name (e.g., "poller", "axpert", "web")
    pub component: String,
    /// Inverter serial number the messages relate to
    pub serialno: Option<String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            serialno: None,
        }
    }

    pub fn with_serialno(mut self, serialno: &str) -> Self {
        self.serialno = Some(serialno.to_string());
        self
    }
}

/// Structured logger with context
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    pub(crate) context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    /// Same component, scoped to one inverter
    pub fn for_serialno(&self, serialno: &str) -> Self {
        Self::new(self.context.clone().with_serialno(serialno))
    }

    pub fn info(&self, message: &str) {
        let fields = self.format_fields();
        info!(%fields, "{}", message);
    }
    pub fn warn(&self, message: &str) {
        let fields = self.format_fields();
        warn!(%fields, "{}", message);
    }
    pub fn error(&self, message: &str) {
        let fields = self.format_fields();
        error!(%fields, "{}", message);
    }
    pub fn debug(&self, message: &str) {
        let fields = self.format_fields();
        debug!(%fields, "{}", message);
    }
    pub fn trace(&self, message: &str) {
        let fields = self.format_fields();
        trace!(%fields, "{}", message);
    }

    fn format_fields(&self) -> String {
        let mut fields = vec![format!("component={}", self.context.component)];
        if let Some(ref serialno) = self.context.serialno {
            fields.push(format!("serialno={}", serialno));
        }
        fields.join(",")
    }
}

/// Create a logger for a specific component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context() {
        let logger = StructuredLogger::new(LogContext::new("poller").with_serialno("92931701100715"));
        assert_eq!(
            logger.format_fields(),
            "component=poller,serialno=92931701100715"
        );
    }

    #[test]
    fn test_for_serialno_keeps_component() {
        let logger = get_logger("commands").for_serialno("123");
        assert_eq!(logger.context.component, "commands");
        assert_eq!(logger.context.serialno.as_deref(), Some("123"));
        logger.debug("no panic without a subscriber");
    }
}
