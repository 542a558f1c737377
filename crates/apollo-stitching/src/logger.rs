use crate::resolvers::FieldResolver;
use crate::resolvers::ResolveInfo;
use crate::resolvers::ResolverError;
use crate::resolvers::Resolvers;
use futures::future::BoxFuture;
use serde_json_bytes::Value as JsonValue;
use std::sync::Arc;

/// Sink for errors returned by resolvers of a composed schema
pub trait Logger: Send + Sync {
    fn log(&self, error: &ResolverError, info: &ResolveInfo<'_>);
}

/// Logs resolver errors as `tracing` error events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, error: &ResolverError, info: &ResolveInfo<'_>) {
        tracing::error!(
            type_name = info.type_name,
            field_name = info.field_name,
            "resolver failed: {error}"
        );
    }
}

struct LoggedResolver {
    resolver: Arc<dyn FieldResolver>,
    logger: Arc<dyn Logger>,
}

impl FieldResolver for LoggedResolver {
    fn resolve<'a>(
        &'a self,
        info: ResolveInfo<'a>,
    ) -> BoxFuture<'a, Result<JsonValue, ResolverError>> {
        Box::pin(async move {
            let result = self.resolver.resolve(info).await;
            if let Err(error) = &result {
                self.logger.log(error, &info)
            }
            result
        })
    }
}

/// Wrap every resolver so that the errors it returns reach `logger` before the caller
pub(crate) fn add_error_logging(resolvers: &mut Resolvers, logger: &Arc<dyn Logger>) {
    for (_, _, resolver) in resolvers.iter_mut() {
        *resolver = Arc::new(LoggedResolver {
            resolver: resolver.clone(),
            logger: logger.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonMap;
    use apollo_compiler::name;
    use futures::executor::block_on;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Logger for Recorder {
        fn log(&self, error: &ResolverError, info: &ResolveInfo<'_>) {
            let entry = format!("{}.{}: {error}", info.type_name, info.field_name);
            self.0.lock().unwrap().push(entry)
        }
    }

    #[test]
    fn errors_are_logged_and_still_returned() {
        let mut resolvers = Resolvers::new();
        resolvers
            .resolve_with(name!("Query"), name!("ok"), |_| Ok(1.into()))
            .resolve_with(name!("Query"), name!("broken"), |_| {
                Err(ResolverError::new("boom"))
            });
        let recorder = Arc::new(Recorder::default());
        let logger: Arc<dyn Logger> = recorder.clone();
        add_error_logging(&mut resolvers, &logger);

        let empty = JsonMap::new();
        let info = |field_name| ResolveInfo {
            type_name: "Query",
            field_name,
            parent: &empty,
            arguments: &empty,
        };
        let ok = resolvers.get("Query", "ok").unwrap();
        assert_eq!(block_on(ok.resolve(info("ok"))), Ok(JsonValue::from(1)));
        let broken = resolvers.get("Query", "broken").unwrap();
        assert_eq!(
            block_on(broken.resolve(info("broken"))),
            Err(ResolverError::new("boom"))
        );
        assert_eq!(*recorder.0.lock().unwrap(), ["Query.broken: boom"]);
    }

    #[traced_test]
    #[test]
    fn tracing_logger_emits_error_events() {
        let empty = JsonMap::new();
        let info = ResolveInfo {
            type_name: "User",
            field_name: "email",
            parent: &empty,
            arguments: &empty,
        };
        TracingLogger.log(&ResolverError::new("upstream timed out"), &info);
        assert!(logs_contain("resolver failed: upstream timed out"));
        assert!(logs_contain("field_name=\"email\""));
    }
}
