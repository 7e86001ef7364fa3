use actcore::{
    Activity, ActivityBehavior, ActivityError, NamedActivity, TypeResolutionError, WorkflowError,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Factory trait for creating activity behaviours of one kind
pub trait ActivityFactory: Send + Sync {
    /// Type name definitions use to refer to this kind (e.g. "WriteLine")
    fn type_name(&self) -> &str;

    /// Trivial construction, used when no injected constructor is registered
    fn create(&self) -> Result<Box<dyn ActivityBehavior>, ActivityError>;

    /// Optional: describe the kind for listings
    fn metadata(&self) -> ActivityMetadata {
        ActivityMetadata::default()
    }
}

/// Metadata about an activity kind
#[derive(Debug, Clone)]
pub struct ActivityMetadata {
    pub description: String,
    pub category: String,
}

impl Default for ActivityMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Resolved activity kind. Clones share the same factory, so two handles for
/// the same cached name compare equal with [`ActivityType::same_as`].
#[derive(Clone)]
pub struct ActivityType(Arc<dyn ActivityFactory>);

impl ActivityType {
    pub fn new(factory: Arc<dyn ActivityFactory>) -> Self {
        Self(factory)
    }

    pub fn name(&self) -> &str {
        self.0.type_name()
    }

    pub fn metadata(&self) -> ActivityMetadata {
        self.0.metadata()
    }

    pub fn factory(&self) -> &Arc<dyn ActivityFactory> {
        &self.0
    }

    pub fn same_as(&self, other: &ActivityType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActivityType").field(&self.name()).finish()
    }
}

/// Enumerates every activity kind known up front
pub trait ActivityCatalog: Send + Sync {
    fn activity_types(&self) -> Vec<Arc<dyn ActivityFactory>>;
}

impl<F> ActivityCatalog for F
where
    F: Fn() -> Vec<Arc<dyn ActivityFactory>> + Send + Sync,
{
    fn activity_types(&self) -> Vec<Arc<dyn ActivityFactory>> {
        self()
    }
}

/// Resolves names missing from the catalog.
///
/// `Ok(None)` means "not found"; errors are reserved for names that cannot
/// be interpreted at all.
pub trait TypeNameResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Option<Arc<dyn ActivityFactory>>, TypeResolutionError>;
}

/// Fallback that never resolves anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl TypeNameResolver for NoFallback {
    fn resolve(&self, _name: &str) -> Result<Option<Arc<dyn ActivityFactory>>, TypeResolutionError> {
        Ok(None)
    }
}

/// Fallback resolving fully-qualified `path::to::Kind` names
#[derive(Default)]
pub struct QualifiedNameResolver {
    types: HashMap<String, Arc<dyn ActivityFactory>>,
}

impl QualifiedNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every factory under `prefix::TypeName`.
    pub fn from_factories(prefix: &str, factories: Vec<Arc<dyn ActivityFactory>>) -> Self {
        let mut resolver = Self::new();
        for factory in factories {
            let path = format!("{}::{}", prefix, factory.type_name());
            resolver.register(path, factory);
        }
        resolver
    }

    pub fn register(&mut self, path: impl Into<String>, factory: Arc<dyn ActivityFactory>) {
        self.types.insert(path.into(), factory);
    }
}

impl TypeNameResolver for QualifiedNameResolver {
    fn resolve(&self, name: &str) -> Result<Option<Arc<dyn ActivityFactory>>, TypeResolutionError> {
        if !name.contains("::") {
            return Ok(None);
        }
        parse_qualified_name(name)?;
        Ok(self.types.get(name).cloned())
    }
}

fn parse_qualified_name(name: &str) -> Result<Vec<&str>, TypeResolutionError> {
    let unparsable = |reason: &str| TypeResolutionError::Unparsable {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = name.split("::").collect();
    for segment in &segments {
        let mut chars = segment.chars();
        match chars.next() {
            None => return Err(unparsable("empty path segment")),
            Some(c) if !(c.is_alphabetic() || c == '_') => {
                return Err(unparsable("segments must start with a letter or underscore"))
            }
            _ => {}
        }
        if !chars.all(|c| c.is_alphanumeric() || c == '_') {
            return Err(unparsable("segments may only contain letters, digits and underscores"));
        }
    }
    Ok(segments)
}

/// Produces behaviour instances for resolved kinds
pub trait InstanceProvider: Send + Sync {
    fn create(&self, activity_type: &ActivityType) -> Result<Box<dyn ActivityBehavior>, ActivityError>;
}

type Constructor = Arc<dyn Fn() -> Box<dyn ActivityBehavior> + Send + Sync>;

/// Uses a registered constructor when the kind has one (typically a closure
/// capturing the kind's dependencies), otherwise the factory's own `create`.
#[derive(Default)]
pub struct DefaultInstanceProvider {
    constructors: HashMap<String, Constructor>,
}

impl DefaultInstanceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_constructor<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn ActivityBehavior> + Send + Sync + 'static,
    {
        self.constructors.insert(type_name.into(), Arc::new(constructor));
    }
}

impl InstanceProvider for DefaultInstanceProvider {
    fn create(&self, activity_type: &ActivityType) -> Result<Box<dyn ActivityBehavior>, ActivityError> {
        match self.constructors.get(activity_type.name()) {
            Some(constructor) => Ok(constructor()),
            None => activity_type.factory().create(),
        }
    }
}

/// Resolves activity type names to kinds and instances.
///
/// The name index is built from the catalog on first use, exactly once, even
/// under concurrent first access. Names found through the fallback resolver
/// are added to the index so later lookups skip the fallback.
pub struct ActivityTypeRegistry {
    catalog: Box<dyn ActivityCatalog>,
    fallback: Box<dyn TypeNameResolver>,
    instances: Box<dyn InstanceProvider>,
    index: OnceLock<RwLock<HashMap<String, ActivityType>>>,
}

impl ActivityTypeRegistry {
    pub fn new(catalog: impl ActivityCatalog + 'static) -> Self {
        Self {
            catalog: Box::new(catalog),
            fallback: Box::new(NoFallback),
            instances: Box::new(DefaultInstanceProvider::new()),
            index: OnceLock::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl TypeNameResolver + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn with_instance_provider(mut self, instances: impl InstanceProvider + 'static) -> Self {
        self.instances = Box::new(instances);
        self
    }

    fn index(&self) -> &RwLock<HashMap<String, ActivityType>> {
        self.index.get_or_init(|| {
            let mut index = HashMap::new();
            for factory in self.catalog.activity_types() {
                let name = factory.type_name().to_string();
                if index.contains_key(&name) {
                    tracing::warn!("Duplicate activity type {} in catalog, keeping first", name);
                    continue;
                }
                index.insert(name, ActivityType::new(factory));
            }
            tracing::info!("Indexed {} activity types", index.len());
            RwLock::new(index)
        })
    }

    /// Resolve a type name to its activity kind
    pub fn resolve_type(&self, name: &str) -> Result<ActivityType, TypeResolutionError> {
        if let Some(found) = self.index().read().get(name) {
            tracing::debug!("Resolved activity type {} from index", name);
            return Ok(found.clone());
        }

        let factory = self
            .fallback
            .resolve(name)?
            .ok_or_else(|| TypeResolutionError::Unknown(name.to_string()))?;

        let mut index = self.index().write();
        let resolved = index
            .entry(name.to_string())
            .or_insert_with(|| ActivityType::new(factory))
            .clone();
        tracing::info!("Resolved activity type {} through fallback", name);
        Ok(resolved)
    }

    /// Resolve a type name and instantiate it
    pub fn resolve_activity(&self, name: &str) -> Result<Activity, WorkflowError> {
        self.resolve_activity_with(name, |_| {})
    }

    /// Resolve a type name, instantiate it and run `setup` on the new activity
    pub fn resolve_activity_with<F>(&self, name: &str, setup: F) -> Result<Activity, WorkflowError>
    where
        F: FnOnce(&mut Activity),
    {
        let activity_type = self.resolve_type(name)?;
        let behavior = self
            .instances
            .create(&activity_type)
            .map_err(|e| WorkflowError::Activation {
                type_name: activity_type.name().to_string(),
                reason: e.to_string(),
            })?;

        let mut activity = Activity::new(activity_type.name(), behavior);
        setup(&mut activity);
        Ok(activity)
    }

    pub fn resolve_activity_of<T: NamedActivity>(&self) -> Result<Activity, WorkflowError> {
        self.resolve_activity(T::TYPE_NAME)
    }

    pub fn resolve_activity_of_with<T, F>(&self, setup: F) -> Result<Activity, WorkflowError>
    where
        T: NamedActivity,
        F: FnOnce(&mut Activity),
    {
        self.resolve_activity_with(T::TYPE_NAME, setup)
    }

    /// All names currently in the index, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index().read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get_metadata(&self, name: &str) -> Option<ActivityMetadata> {
        self.index().read().get(name).map(|t| t.metadata())
    }
}
