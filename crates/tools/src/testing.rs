//! In-memory data sources and tools for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finmcp_core::AdapterFailure;
use serde_json::{Map, Value};

use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::{AdapterResult, HttpSource, LibrarySource};
use crate::{Synthetic, Tool, ToolContext};

/// Answers by the longest matching endpoint prefix, else `fallback`.
pub struct FakeHttp {
    routes: Vec<(String, AdapterResult)>,
    fallback: AdapterResult,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeHttp {
    pub fn failing() -> Self {
        Self {
            routes: Vec::new(),
            fallback: Err(AdapterFailure::network("API call failed: connection refused")),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, prefix: &str, result: AdapterResult) -> Self {
        self.routes.push((prefix.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSource for FakeHttp {
    async fn get(&self, endpoint: &str, query: &[(String, String)]) -> AdapterResult {
        self.calls.lock().unwrap().push((endpoint.to_string(), query.to_vec()));
        self.routes
            .iter()
            .filter(|(prefix, _)| endpoint.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Answers by exact function name, else `fallback`.
pub struct FakeLibrary {
    functions: Vec<(String, AdapterResult)>,
    fallback: AdapterResult,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl FakeLibrary {
    pub fn failing() -> Self {
        Self {
            functions: Vec::new(),
            fallback: Err(AdapterFailure::process("exited with status 1: No module named 'akshare'")),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn function(mut self, name: &str, result: AdapterResult) -> Self {
        self.functions.push((name.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LibrarySource for FakeLibrary {
    async fn invoke(&self, function: &str, kwargs: &Map<String, Value>) -> AdapterResult {
        self.calls.lock().unwrap().push((function.to_string(), kwargs.clone()));
        self.functions
            .iter()
            .find(|(name, _)| name == function)
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn context(http: FakeHttp, library: FakeLibrary) -> (ToolContext, Arc<FakeHttp>, Arc<FakeLibrary>) {
    let http = Arc::new(http);
    let library = Arc::new(library);
    (ToolContext::new(http.clone(), library.clone()), http, library)
}

pub fn failing_context() -> ToolContext {
    context(FakeHttp::failing(), FakeLibrary::failing()).0
}

pub fn args(value: Value) -> NormalizedArguments {
    NormalizedArguments::from(value.as_object().cloned().unwrap_or_default())
}

/// Tool whose every source answer is fixed up front.
pub struct ScriptedTool {
    name: &'static str,
    primary: AdapterResult,
    secondary: Option<AdapterResult>,
    synthetic: Option<Synthetic>,
    panics: bool,
    secondary_calls: AtomicUsize,
}

impl ScriptedTool {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            primary: Err(AdapterFailure::network("down")),
            secondary: None,
            synthetic: None,
            panics: false,
            secondary_calls: AtomicUsize::new(0),
        }
    }

    pub fn primary(mut self, result: AdapterResult) -> Self {
        self.primary = result;
        self
    }

    pub fn secondary(mut self, result: AdapterResult) -> Self {
        self.secondary = Some(result);
        self
    }

    pub fn with_synthetic(mut self, kind: Synthetic) -> Self {
        self.synthetic = Some(kind);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn secondary_calls(&self) -> usize {
        self.secondary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name, "Scripted test tool")
            .field(FieldSpec::optional("symbol", FieldType::String, "Symbol"))
    }

    async fn invoke(&self, _ctx: &ToolContext, _args: &NormalizedArguments) -> AdapterResult {
        if self.panics {
            panic!("scripted panic");
        }
        self.primary.clone()
    }

    async fn invoke_secondary(&self, _ctx: &ToolContext, _args: &NormalizedArguments) -> Option<AdapterResult> {
        self.secondary_calls.fetch_add(1, Ordering::SeqCst);
        self.secondary.clone()
    }

    fn synthetic(&self) -> Option<Synthetic> {
        self.synthetic
    }

    fn summary(&self, _args: &NormalizedArguments, _payload: &Value) -> String {
        format!("{} ok", self.name)
    }
}
