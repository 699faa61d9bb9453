//! Runtime types and values seen by the dispatcher.
//!
//! This is the host object model the dispatch engine runs against:
//!
//! - [`Ty`] is a handle to a type object. Two handles are equal only when
//!   they name the same type; there is no structural comparison.
//! - [`Value`] is a dynamically typed runtime value. [`Value::type_of`]
//!   yields its exact type, which is what signatures are matched against.
//! - A finished type owns a [`Namespace`] of [`Member`]s. Overloaded names
//!   hold a shared [`Dispatcher`]; everything else is a plain value.
//!
//! Field storage on instances is intentionally absent; objects carry their
//! type and identity only.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::dispatch::{BoundMember, DispatchError, DispatchResult, Dispatcher};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a type object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyId(u64);

impl TyId {
    fn fresh() -> Self {
        Self(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identity number.
    pub fn index(self) -> u64 {
        self.0
    }
}

/// The attributes of a finished type, in definition order.
pub type Namespace = IndexMap<String, Member>;

/// A namespace entry.
#[derive(Debug, Clone)]
pub enum Member {
    /// A plain attribute value.
    Value(Value),
    /// An overloaded member.
    Dispatcher(Arc<Dispatcher>),
}

impl Member {
    /// The dispatcher, if this member is overloaded.
    pub fn as_dispatcher(&self) -> Option<&Arc<Dispatcher>> {
        match self {
            Member::Dispatcher(d) => Some(d),
            Member::Value(_) => None,
        }
    }
}

struct TyData {
    id: TyId,
    name: String,
    bases: Vec<Ty>,
    /// Method resolution order without the type itself.
    ancestors: Vec<Ty>,
    /// Written once, when the type is finished.
    namespace: OnceLock<Namespace>,
}

/// A handle to a type object.
#[derive(Clone)]
pub struct Ty(Arc<TyData>);

impl Ty {
    /// Declare a type whose namespace is not installed yet.
    ///
    /// A type with no bases derives from `object`.
    pub(crate) fn declare(name: impl Into<String>, bases: Vec<Ty>) -> Ty {
        let bases = if bases.is_empty() {
            vec![Ty::object()]
        } else {
            bases
        };
        Self::with_bases(name.into(), bases)
    }

    fn with_bases(name: String, bases: Vec<Ty>) -> Ty {
        let mut ancestors: Vec<Ty> = Vec::new();
        for base in &bases {
            for ty in base.mro() {
                if !ancestors.contains(ty) {
                    ancestors.push(ty.clone());
                }
            }
        }

        Ty(Arc::new(TyData {
            id: TyId::fresh(),
            name,
            bases,
            ancestors,
            namespace: OnceLock::new(),
        }))
    }

    fn builtin(name: &str, bases: Vec<Ty>) -> Ty {
        let ty = Self::with_bases(name.to_string(), bases);
        ty.install_namespace(Namespace::new());
        ty
    }

    /// Install the final namespace. Returns false if one was already installed.
    pub(crate) fn install_namespace(&self, namespace: Namespace) -> bool {
        self.0.namespace.set(namespace).is_ok()
    }

    pub fn id(&self) -> TyId {
        self.0.id
    }

    /// A handle that does not keep the type alive.
    pub fn downgrade(&self) -> WeakTy {
        WeakTy {
            id: self.0.id,
            data: Arc::downgrade(&self.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Direct bases, in declaration order.
    pub fn bases(&self) -> &[Ty] {
        &self.0.bases
    }

    /// Method resolution order, starting with this type.
    pub fn mro(&self) -> impl Iterator<Item = &Ty> {
        std::iter::once(self).chain(self.0.ancestors.iter())
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_subtype_of(&self, other: &Ty) -> bool {
        self.mro().any(|ty| ty == other)
    }

    /// Whether the namespace has been installed.
    pub fn is_finished(&self) -> bool {
        self.0.namespace.get().is_some()
    }

    /// The type's own namespace (not including inherited members).
    pub fn namespace(&self) -> Option<&Namespace> {
        self.0.namespace.get()
    }

    /// Find a member along the MRO, returning it with the type that declares it.
    pub fn lookup(&self, name: &str) -> Option<(&Ty, &Member)> {
        self.mro().find_map(|ty| {
            ty.namespace()
                .and_then(|ns| ns.get(name))
                .map(|member| (ty, member))
        })
    }

    /// Read an attribute through the type (class access).
    pub fn get_attr(&self, name: &str) -> DispatchResult<Attribute> {
        match self.lookup(name) {
            Some((_, Member::Value(value))) => Ok(Attribute::Value(value.clone())),
            Some((_, Member::Dispatcher(d))) => {
                Ok(Attribute::Method(BoundMember::for_class(d.clone(), self.clone())))
            }
            None => Err(DispatchError::AttributeMissing {
                type_name: self.name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Read `name` through the type and call it with `args`.
    pub fn call_method(&self, name: &str, args: &[Value]) -> DispatchResult<Value> {
        self.get_attr(name)?.call(self.name(), name, args)
    }

    /// Create a new instance of this type.
    pub fn instantiate(&self) -> Value {
        Value::Object(Instance::new(self.clone()))
    }

    pub fn object() -> Ty {
        builtins().object.clone()
    }

    pub fn int() -> Ty {
        builtins().int.clone()
    }

    pub fn float() -> Ty {
        builtins().float.clone()
    }

    pub fn str() -> Ty {
        builtins().str.clone()
    }

    pub fn bool() -> Ty {
        builtins().bool.clone()
    }

    pub fn none() -> Ty {
        builtins().none.clone()
    }

    /// The type of type objects.
    pub fn type_() -> Ty {
        builtins().type_.clone()
    }
}

impl PartialEq for Ty {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Ty {}

impl Hash for Ty {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({}#{})", self.0.name, self.0.id.0)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// A non-owning handle to a type object. Keeps the identity after the
/// type is dropped.
#[derive(Clone)]
pub struct WeakTy {
    id: TyId,
    data: Weak<TyData>,
}

impl WeakTy {
    pub fn id(&self) -> TyId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Ty> {
        self.data.upgrade().map(Ty)
    }
}

impl fmt::Debug for WeakTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(ty) => write!(f, "WeakTy({}#{})", ty.name(), self.id.0),
            None => write!(f, "WeakTy(<dropped>#{})", self.id.0),
        }
    }
}

struct Builtins {
    object: Ty,
    int: Ty,
    float: Ty,
    str: Ty,
    bool: Ty,
    none: Ty,
    type_: Ty,
}

fn builtins() -> &'static Builtins {
    static BUILTINS: OnceLock<Builtins> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        let object = Ty::builtin("object", vec![]);
        let leaf = |name: &str| Ty::builtin(name, vec![object.clone()]);
        Builtins {
            int: leaf("int"),
            float: leaf("float"),
            str: leaf("str"),
            bool: leaf("bool"),
            none: leaf("NoneType"),
            type_: leaf("type"),
            object,
        }
    })
}

struct InstanceData {
    id: u64,
    class: Ty,
}

/// An object of a user-defined type.
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

impl Instance {
    pub fn new(class: Ty) -> Self {
        Instance(Arc::new(InstanceData {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            class,
        }))
    }

    pub fn class(&self) -> &Ty {
        &self.0.class
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object #{}>", self.0.class.name(), self.0.id)
    }
}

/// A dynamically typed runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(Arc<str>),
    Type(Ty),
    Object(Instance),
}

impl Value {
    pub fn float(value: f64) -> Self {
        Value::Float(OrderedFloat(value))
    }

    pub fn str(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }

    /// The exact runtime type of this value.
    ///
    /// `bool` is its own type here, never `int`.
    pub fn type_of(&self) -> Ty {
        match self {
            Value::None => Ty::none(),
            Value::Bool(_) => Ty::bool(),
            Value::Int(_) => Ty::int(),
            Value::Float(_) => Ty::float(),
            Value::Str(_) => Ty::str(),
            Value::Type(_) => Ty::type_(),
            Value::Object(inst) => inst.class().clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(x.into_inner()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Ty> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(inst) => Some(inst),
            _ => None,
        }
    }

    /// Read an attribute through this value.
    ///
    /// Type values are read with class access; anything else looks the name
    /// up on its runtime type and binds itself as receiver.
    pub fn get_attr(&self, name: &str) -> DispatchResult<Attribute> {
        if let Value::Type(ty) = self {
            return ty.get_attr(name);
        }

        let ty = self.type_of();
        match ty.lookup(name) {
            Some((_, Member::Value(value))) => Ok(Attribute::Value(value.clone())),
            Some((_, Member::Dispatcher(d))) => Ok(Attribute::Method(BoundMember::for_instance(
                d.clone(),
                self.clone(),
            ))),
            None => Err(DispatchError::AttributeMissing {
                type_name: ty.name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Read `name` through this value and call it with `args`.
    pub fn call_method(&self, name: &str, args: &[Value]) -> DispatchResult<Value> {
        let ty = self.type_of();
        self.get_attr(name)?.call(ty.name(), name, args)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Ty> for Value {
    fn from(value: Ty) -> Self {
        Value::Type(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x.into_inner()),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Type(ty) => write!(f, "<type {}>", ty),
            Value::Object(inst) => write!(f, "{:?}", inst),
        }
    }
}

/// The result of reading an attribute.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// A plain attribute value.
    Value(Value),
    /// An overloaded member bound for a single call.
    Method(BoundMember),
}

impl Attribute {
    pub fn into_method(self) -> Option<BoundMember> {
        match self {
            Attribute::Method(m) => Some(m),
            Attribute::Value(_) => None,
        }
    }

    fn call(self, type_name: &str, name: &str, args: &[Value]) -> DispatchResult<Value> {
        match self {
            Attribute::Method(m) => m.call(args),
            Attribute::Value(_) => Err(DispatchError::NotCallable {
                type_name: type_name.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
