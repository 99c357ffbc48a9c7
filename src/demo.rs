//! Sample handlers registered by the server binary.

use serde_json::{json, Value};

use route_dispatch::catalog::{Handler, HandlerRegistry, MethodInfo, ParamInfo, TypeInfo};

struct UsersController;

impl Handler for UsersController {
    fn invoke(&self, method: &str) -> Option<Value> {
        match method {
            "index" => Some(json!({ "users": ["ada", "grace", "linus"] })),
            "show" => Some(json!({ "user": "ada" })),
            "store" => Some(json!({ "created": true })),
            "destroy" => Some(json!({ "deleted": true })),
            _ => None,
        }
    }
}

struct HealthController;

impl Handler for HealthController {
    fn invoke(&self, method: &str) -> Option<Value> {
        (method == "check").then(|| json!({ "status": "ok" }))
    }
}

struct ReportsController;

impl Handler for ReportsController {
    fn invoke(&self, method: &str) -> Option<Value> {
        (method == "index").then(|| json!({ "reports": [] }))
    }
}

pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .register_type(
            TypeInfo::abstract_type("App.Http.Controllers.Controller")
                .method(MethodInfo::public("callAction"))
                .method(MethodInfo::public("middleware")),
        )
        .register(
            TypeInfo::concrete("App.Http.Controllers.UsersController")
                .extends("App.Http.Controllers.Controller")
                .method(MethodInfo::public("index"))
                .method(MethodInfo::public("show").param(ParamInfo::optional("id", "int")))
                .method(MethodInfo::public("store"))
                .method(MethodInfo::public("destroy"))
                .method(MethodInfo::public("rebuildIndex").marker("@internal")),
            || Box::new(UsersController),
        )
        .register(
            TypeInfo::concrete("App.Http.Controllers.System.HealthController")
                .extends("App.Http.Controllers.Controller")
                .method(MethodInfo::public("check")),
            || Box::new(HealthController),
        )
        .register_with_deps(
            TypeInfo::concrete("App.Http.Controllers.ReportsController")
                .extends("App.Http.Controllers.Controller")
                .method(MethodInfo::public("index")),
            &["ReportingDatabase"],
            || Box::new(ReportsController),
        )
}
