//! Server-side implementations behind exported names
//!
//! A declared class is backed by a [`CallableClass`] bound under its
//! qualified name, a declared function by a [`CallableFunction`]. Both run
//! with a [`CallContext`] giving access to the resolved options and the
//! active response.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tether_callable::CallableEntity;
use tether_core::{Options, Target};
use tether_response::Response;

/// Method table exported as a client-side class
#[async_trait]
pub trait CallableClass: Send + Sync + fmt::Debug {
    /// Methods this class implements
    ///
    /// Only these are exported; protected and excluded methods are
    /// filtered out by their options.
    fn methods(&self) -> &[&'static str];

    /// Invoke a method
    ///
    /// `args` are the method arguments: the request arguments for the
    /// requested method, the declared hook arguments for a hook.
    async fn call(
        &self,
        method: &str,
        args: &[Value],
        ctx: &mut CallContext<'_>,
    ) -> anyhow::Result<()>;

    /// Check if this class implements a method
    fn has_method(&self, method: &str) -> bool {
        self.methods().contains(&method)
    }
}

/// Function exported to the client
#[async_trait]
pub trait CallableFunction: Send + Sync + fmt::Debug {
    /// Invoke the function
    async fn call(&self, args: &[Value], ctx: &mut CallContext<'_>) -> anyhow::Result<()>;
}

/// Synchronous closure exported as a function
pub struct FnFunction<F> {
    f: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&[Value], &mut CallContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> CallableFunction for FnFunction<F>
where
    F: Fn(&[Value], &mut CallContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    async fn call(&self, args: &[Value], ctx: &mut CallContext<'_>) -> anyhow::Result<()> {
        (self.f)(args, ctx)
    }
}

/// State of one call, shared by the requested method and its hooks
#[derive(Debug)]
pub struct CallContext<'a> {
    target: &'a Target,
    args: &'a [Value],
    entity: &'a CallableEntity,
    response: &'a mut Response,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        target: &'a Target,
        args: &'a [Value],
        entity: &'a CallableEntity,
        response: &'a mut Response,
    ) -> Self {
        Self {
            target,
            args,
            entity,
            response,
        }
    }

    /// The requested target
    pub fn target(&self) -> &Target {
        self.target
    }

    /// Arguments of the request, as sent by the client
    pub fn request_args(&self) -> &[Value] {
        self.args
    }

    /// The resolved entity
    pub fn entity(&self) -> &CallableEntity {
        self.entity
    }

    /// Merged options of the requested method
    pub fn options(&self) -> &Options {
        self.entity.options_for(self.method_key())
    }

    /// Single merged option of the requested method
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options().get(key)
    }

    /// Dependency bindings of the requested method
    pub fn di(&self) -> Option<&BTreeMap<String, String>> {
        self.entity.di_bindings(self.method_key())
    }

    /// The active response
    pub fn response(&mut self) -> &mut Response {
        self.response
    }

    fn method_key(&self) -> &str {
        if self.target.is_class() {
            self.target.method_name()
        } else {
            self.target.function_name()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_callable::CallableRepository;

    #[tokio::test]
    async fn test_fn_function_reads_context() {
        let repo = CallableRepository::default();
        let mut options = Options::new();
        options.insert("greeting".to_string(), json!("hi"));
        repo.declare_function("hello", options).unwrap();
        let entity = repo.resolve_function("hello").unwrap();

        let target = Target::function("hello");
        let args = vec![json!("bob")];
        let mut response = Response::new();

        let hello = FnFunction::new(|args, ctx| {
            let greeting = ctx.option("greeting").and_then(Value::as_str).unwrap_or("");
            let name = args.first().and_then(Value::as_str).unwrap_or("");
            let message = format!("{greeting} {name}");
            ctx.response().assign("out", "innerHTML", message);
            Ok(())
        });

        let mut ctx = CallContext::new(&target, &args, &entity, &mut response);
        hello.call(&args, &mut ctx).await.unwrap();
        assert_eq!(ctx.request_args(), args.as_slice());
        assert!(ctx.di().is_none());

        assert_eq!(response.len(), 1);
        assert_eq!(
            response.serialize()[0]["args"]["value"],
            json!("hi bob")
        );
    }
}
