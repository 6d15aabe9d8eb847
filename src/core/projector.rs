//! Shape projection: record-like values to a message plus named properties
//!
//! Any `Serialize` value that serializes as a struct or a map can be
//! projected. The first value of each concrete type is scanned once to build
//! a [`ShapePlan`] (field order, which fields feed the message, which are
//! shadowed duplicates). The plan is cached by `TypeId`; later values of the
//! same type only have their field values converted and routed. A value that
//! is not a record is rejected on its own and leaves the cache untouched, so
//! `Option`, enums and `serde_json::Value` project each value by what it is.
//!
//! Fields named `text`, `txt`, `message` or `msg` fill the message slot
//! (the last one wins). Every other field becomes a property under its
//! original-case name. When a name repeats, the first occurrence wins.

use super::error::{LoggerError, Result};
use super::properties::{FieldValue, Properties};
use parking_lot::RwLock;
use serde::ser::{self, Impossible, Serializer};
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_PROJECTOR: OnceLock<Arc<ShapeProjector>> = OnceLock::new();

/// Field names routed to the event message
pub const MESSAGE_FIELDS: [&str; 4] = ["text", "txt", "message", "msg"];

/// How field names are compared against [`MESSAGE_FIELDS`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// `Message`, `MSG` and `message` all match
    #[default]
    CaseInsensitive,
    /// Only the lowercase spellings match
    Exact,
}

impl MatchMode {
    pub fn is_message_field(self, name: &str) -> bool {
        match self {
            MatchMode::CaseInsensitive => MESSAGE_FIELDS
                .iter()
                .any(|reserved| name.eq_ignore_ascii_case(reserved)),
            MatchMode::Exact => MESSAGE_FIELDS.contains(&name),
        }
    }
}

/// Message and properties extracted from one value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub message: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Message,
    Property,
    /// Repeated name; the first occurrence already claimed it
    Shadowed,
}

#[derive(Debug, Clone)]
pub struct FieldRoute {
    pub name: &'static str,
    pub route: Route,
}

#[derive(Debug, Clone)]
enum PlanKind {
    /// Struct-like: field names are fixed by the type
    Static(Vec<FieldRoute>),
    /// Map-like: keys are only known per value
    Dynamic,
    Unsupported(String),
}

/// Extraction routine compiled for one concrete type
#[derive(Debug, Clone)]
pub struct ShapePlan {
    type_name: &'static str,
    mode: MatchMode,
    kind: PlanKind,
}

impl ShapePlan {
    fn compile<T: Serialize + ?Sized>(value: &T, type_name: &'static str, mode: MatchMode) -> Self {
        let mut scanner = ShapeScanner::default();
        let kind = match value.serialize(RecordSerializer { sink: &mut scanner }) {
            Err(e) => PlanKind::Unsupported(e.0),
            Ok(()) => match scanner.kind {
                Some(RecordKind::Struct) => PlanKind::Static(Self::routes(&scanner.names, mode)),
                Some(RecordKind::Map) => PlanKind::Dynamic,
                None => PlanKind::Unsupported("value is not a record".to_string()),
            },
        };

        Self {
            type_name,
            mode,
            kind,
        }
    }

    fn routes(names: &[&'static str], mode: MatchMode) -> Vec<FieldRoute> {
        let mut seen: Vec<&'static str> = Vec::with_capacity(names.len());
        names
            .iter()
            .map(|&name| {
                let route = if seen.contains(&name) {
                    Route::Shadowed
                } else {
                    seen.push(name);
                    if mode.is_message_field(name) {
                        Route::Message
                    } else {
                        Route::Property
                    }
                };
                FieldRoute { name, route }
            })
            .collect()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Routes in field order; empty for map-like and unsupported shapes
    pub fn fields(&self) -> &[FieldRoute] {
        match &self.kind {
            PlanKind::Static(fields) => fields,
            _ => &[],
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, PlanKind::Dynamic)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self.kind, PlanKind::Unsupported(_))
    }

    fn extract<T: Serialize + ?Sized>(&self, value: &T) -> Result<Projection> {
        if let PlanKind::Unsupported(reason) = &self.kind {
            return Err(LoggerError::unsupported_shape(self.type_name, reason.clone()));
        }

        let mut extractor = Extractor::new(self);
        value
            .serialize(RecordSerializer {
                sink: &mut extractor,
            })
            .map_err(|e| LoggerError::unsupported_shape(self.type_name, e.0))?;

        Ok(Projection {
            message: extractor.message,
            properties: extractor.properties,
        })
    }
}

/// Projects values into messages and properties, caching one plan per type
///
/// # Example
///
/// ```
/// use serde::Serialize;
/// use trace_bridge::ShapeProjector;
///
/// #[derive(Serialize)]
/// struct Login<'a> {
///     #[serde(rename = "Message")]
///     message: &'a str,
///     user: &'a str,
/// }
///
/// let projector = ShapeProjector::new();
/// let projection = projector.project(&Login { message: "signed in", user: "ada" });
///
/// assert_eq!(projection.message, "signed in");
/// assert_eq!(projection.properties.get("user").unwrap().to_string(), "ada");
/// assert!(projection.properties.get("Message").is_none());
/// ```
#[derive(Debug)]
pub struct ShapeProjector {
    mode: MatchMode,
    plans: RwLock<HashMap<TypeId, Arc<ShapePlan>>>,
    compiled: AtomicU64,
}

impl ShapeProjector {
    pub fn new() -> Self {
        Self::with_mode(MatchMode::default())
    }

    pub fn with_mode(mode: MatchMode) -> Self {
        Self {
            mode,
            plans: RwLock::new(HashMap::new()),
            compiled: AtomicU64::new(0),
        }
    }

    /// The process-wide projector, created on first use
    pub fn global() -> Arc<ShapeProjector> {
        Arc::clone(GLOBAL_PROJECTOR.get_or_init(|| Arc::new(ShapeProjector::new())))
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Project a value, treating unsupported shapes as empty
    pub fn project<T: Serialize + ?Sized + 'static>(&self, value: &T) -> Projection {
        self.try_project(value).unwrap_or_default()
    }

    /// Project a value, reporting unsupported shapes
    pub fn try_project<T: Serialize + ?Sized + 'static>(&self, value: &T) -> Result<Projection> {
        self.plan_for(value).extract(value)
    }

    /// Cached plan for `T`, if a value of that type was already projected
    pub fn plan_of<T: ?Sized + 'static>(&self) -> Option<Arc<ShapePlan>> {
        self.plans.read().get(&TypeId::of::<T>()).cloned()
    }

    /// Number of plans cached so far
    pub fn compiled_shapes(&self) -> u64 {
        self.compiled.load(Ordering::Relaxed)
    }

    fn plan_for<T: Serialize + ?Sized + 'static>(&self, value: &T) -> Arc<ShapePlan> {
        let id = TypeId::of::<T>();

        if let Some(plan) = self.plans.read().get(&id) {
            return Arc::clone(plan);
        }

        // Compiled with no lock held: `value.serialize` may project through this projector
        let plan = Arc::new(ShapePlan::compile(value, type_name::<T>(), self.mode));
        if !plan.is_supported() {
            // The rejection may belong to this value only (`None`, a unit variant, a JSON scalar)
            return plan;
        }

        let mut plans = self.plans.write();
        let cached = plans.entry(id).or_insert_with(|| {
            self.compiled.fetch_add(1, Ordering::Relaxed);
            plan
        });
        Arc::clone(cached)
    }
}

impl Default for ShapeProjector {
    fn default() -> Self {
        Self::new()
    }
}

fn to_field_value<T: Serialize + ?Sized>(value: &T) -> FieldValue {
    serde_json::to_value(value)
        .map(FieldValue::from_json_value)
        .unwrap_or(FieldValue::Null)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Struct,
    Map,
}

/// Receives the top-level fields of a record as it serializes
trait FieldSink {
    fn begin(&mut self, kind: RecordKind);
    fn struct_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T);
    fn map_entry<T: Serialize + ?Sized>(&mut self, key: String, value: &T);
}

/// Records field names only; values are never serialized
#[derive(Default)]
struct ShapeScanner {
    kind: Option<RecordKind>,
    names: Vec<&'static str>,
}

impl FieldSink for ShapeScanner {
    fn begin(&mut self, kind: RecordKind) {
        self.kind.get_or_insert(kind);
    }

    fn struct_field<T: Serialize + ?Sized>(&mut self, key: &'static str, _value: &T) {
        self.names.push(key);
    }

    fn map_entry<T: Serialize + ?Sized>(&mut self, _key: String, _value: &T) {}
}

struct Extractor<'p> {
    plan: &'p ShapePlan,
    cursor: usize,
    /// Set once the value's fields stop matching the plan (skipped fields)
    drifted: bool,
    message_keys: Vec<String>,
    message: String,
    properties: Properties,
}

impl<'p> Extractor<'p> {
    fn new(plan: &'p ShapePlan) -> Self {
        Self {
            plan,
            cursor: 0,
            drifted: false,
            message_keys: Vec::new(),
            message: String::new(),
            properties: Properties::with_capacity(plan.fields().len()),
        }
    }

    fn dynamic_route(&mut self, key: &str) -> Route {
        if self.plan.mode.is_message_field(key) {
            if self.message_keys.iter().any(|k| k == key) {
                Route::Shadowed
            } else {
                self.message_keys.push(key.to_string());
                Route::Message
            }
        } else if self.properties.contains_key(key) {
            Route::Shadowed
        } else {
            Route::Property
        }
    }

    fn drift(&mut self) {
        self.drifted = true;
        let plan = self.plan;
        let seen = &plan.fields()[..self.cursor.min(plan.fields().len())];
        self.message_keys = seen
            .iter()
            .filter(|f| f.route == Route::Message)
            .map(|f| f.name.to_string())
            .collect();
    }

    fn apply<T: Serialize + ?Sized>(&mut self, route: Route, key: &str, value: &T) {
        match route {
            Route::Shadowed => {}
            Route::Message => self.message = to_field_value(value).to_message(),
            Route::Property => self.properties.insert(key, to_field_value(value)),
        }
    }
}

impl FieldSink for Extractor<'_> {
    fn begin(&mut self, _kind: RecordKind) {}

    fn struct_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) {
        let planned = match self.plan.fields().get(self.cursor) {
            Some(field) if !self.drifted && field.name == key => Some(field.route),
            _ => None,
        };
        let route = match planned {
            Some(route) => route,
            None => {
                if !self.drifted {
                    self.drift();
                }
                self.dynamic_route(key)
            }
        };
        self.cursor += 1;
        self.apply(route, key, value);
    }

    fn map_entry<T: Serialize + ?Sized>(&mut self, key: String, value: &T) {
        let route = self.dynamic_route(&key);
        self.apply(route, &key, value);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ProjectionError(String);

impl ser::Error for ProjectionError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ProjectionError(msg.to_string())
    }
}

impl ProjectionError {
    fn unsupported(what: &str) -> Self {
        ProjectionError(format!("{} has no named fields", what))
    }
}

/// Top-level serializer: accepts records, unwraps newtypes, rejects the rest
struct RecordSerializer<'s, S> {
    sink: &'s mut S,
}

macro_rules! reject {
    ($($method:ident($($arg:ident: $ty:ty),*) => $what:literal;)*) => {
        $(
            fn $method(self, $($arg: $ty),*) -> std::result::Result<(), ProjectionError> {
                $(let _ = $arg;)*
                Err(ProjectionError::unsupported($what))
            }
        )*
    };
}

impl<'s, S: FieldSink> Serializer for RecordSerializer<'s, S> {
    type Ok = ();
    type Error = ProjectionError;
    type SerializeSeq = Impossible<(), ProjectionError>;
    type SerializeTuple = Impossible<(), ProjectionError>;
    type SerializeTupleStruct = Impossible<(), ProjectionError>;
    type SerializeTupleVariant = Impossible<(), ProjectionError>;
    type SerializeMap = MapFields<'s, S>;
    type SerializeStruct = StructFields<'s, S>;
    type SerializeStructVariant = StructFields<'s, S>;

    reject! {
        serialize_bool(v: bool) => "bool";
        serialize_i8(v: i8) => "integer";
        serialize_i16(v: i16) => "integer";
        serialize_i32(v: i32) => "integer";
        serialize_i64(v: i64) => "integer";
        serialize_u8(v: u8) => "integer";
        serialize_u16(v: u16) => "integer";
        serialize_u32(v: u32) => "integer";
        serialize_u64(v: u64) => "integer";
        serialize_f32(v: f32) => "float";
        serialize_f64(v: f64) => "float";
        serialize_char(v: char) => "char";
        serialize_str(v: &str) => "string";
        serialize_bytes(v: &[u8]) => "bytes";
        serialize_none() => "none";
        serialize_unit() => "unit";
        serialize_unit_struct(name: &'static str) => "unit struct";
        serialize_unit_variant(name: &'static str, index: u32, variant: &'static str) => "unit variant";
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> std::result::Result<(), ProjectionError> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> std::result::Result<(), ProjectionError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> std::result::Result<(), ProjectionError> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self::SerializeSeq, ProjectionError> {
        Err(ProjectionError::unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, ProjectionError> {
        Err(ProjectionError::unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, ProjectionError> {
        Err(ProjectionError::unsupported("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, ProjectionError> {
        Err(ProjectionError::unsupported("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self::SerializeMap, ProjectionError> {
        self.sink.begin(RecordKind::Map);
        Ok(MapFields {
            sink: self.sink,
            key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, ProjectionError> {
        self.sink.begin(RecordKind::Struct);
        Ok(StructFields { sink: self.sink })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, ProjectionError> {
        self.sink.begin(RecordKind::Struct);
        Ok(StructFields { sink: self.sink })
    }
}

struct StructFields<'s, S> {
    sink: &'s mut S,
}

impl<S: FieldSink> ser::SerializeStruct for StructFields<'_, S> {
    type Ok = ();
    type Error = ProjectionError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> std::result::Result<(), ProjectionError> {
        self.sink.struct_field(key, value);
        Ok(())
    }

    fn end(self) -> std::result::Result<(), ProjectionError> {
        Ok(())
    }
}

impl<S: FieldSink> ser::SerializeStructVariant for StructFields<'_, S> {
    type Ok = ();
    type Error = ProjectionError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> std::result::Result<(), ProjectionError> {
        self.sink.struct_field(key, value);
        Ok(())
    }

    fn end(self) -> std::result::Result<(), ProjectionError> {
        Ok(())
    }
}

struct MapFields<'s, S> {
    sink: &'s mut S,
    key: Option<String>,
}

impl<S: FieldSink> ser::SerializeMap for MapFields<'_, S> {
    type Ok = ();
    type Error = ProjectionError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> std::result::Result<(), ProjectionError> {
        let key = match serde_json::to_value(key) {
            Ok(serde_json::Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(e) => return Err(ProjectionError(e.to_string())),
        };
        self.key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> std::result::Result<(), ProjectionError> {
        let key = self
            .key
            .take()
            .ok_or_else(|| ProjectionError("map value without a key".to_string()))?;
        self.sink.map_entry(key, value);
        Ok(())
    }

    fn end(self) -> std::result::Result<(), ProjectionError> {
        Ok(())
    }
}
