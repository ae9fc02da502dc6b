//! Static lookup tables backing the classifier predicates.
//!
//! Process-wide immutable data, injected into `Classifier` instances so
//! tests can swap in their own tables instead of patching globals.

use phf::phf_set;

/// All lookup tables a `Classifier` consults.
#[derive(Debug, Clone, Copy)]
pub struct Tables {
    /// Framework utility classes that must never classify as models or
    /// query sources, regardless of how model-like a chain looks.
    pub excluded_classes: &'static phf::Set<&'static str>,
    /// Namespace prefixes that identify Eloquent models.
    pub model_namespaces: &'static [&'static str],
    /// Class-name suffixes that identify models.
    pub model_suffixes: &'static [&'static str],
    /// Database facade classes (`DB::table(...)` style).
    pub db_facades: &'static phf::Set<&'static str>,
    /// Query-builder methods seen before a fetch.
    pub builder_methods: &'static phf::Set<&'static str>,
    /// Methods that execute a query and materialize results.
    pub fetch_methods: &'static phf::Set<&'static str>,
    /// Collection methods that narrow or reorder an in-memory result set.
    pub collection_filter_methods: &'static phf::Set<&'static str>,
    /// Filesystem facade classes.
    pub filesystem_classes: &'static phf::Set<&'static str>,
    /// Global PHP filesystem functions.
    pub filesystem_functions: &'static phf::Set<&'static str>,
    /// Laravel path helpers whose arguments are never hardcoded-path smells.
    pub path_helpers: &'static phf::Set<&'static str>,
    /// Classes whose static calls count as logging/reporting sinks.
    pub logging_classes: &'static phf::Set<&'static str>,
    /// Global functions that count as logging/reporting sinks.
    pub logging_functions: &'static phf::Set<&'static str>,
    /// Eloquent relationship definition methods.
    pub relationship_methods: &'static phf::Set<&'static str>,
    /// Model properties that are framework plumbing, never relationships.
    pub reserved_properties: &'static phf::Set<&'static str>,
    /// Route facade methods that register an endpoint.
    pub route_registrars: &'static phf::Set<&'static str>,
    /// Helper functions whose chains are in-memory, never query results.
    pub excluded_functions: &'static phf::Set<&'static str>,
    /// Class-name suffixes that identify service-layer types.
    pub service_suffixes: &'static [&'static str],
}

static EXCLUDED_CLASSES: phf::Set<&'static str> = phf_set! {
    "Arr",
    "Str",
    "Collection",
    "Carbon",
    "CarbonImmutable",
    "Auth",
    "Cache",
    "Config",
    "Cookie",
    "Crypt",
    "Event",
    "Gate",
    "Hash",
    "Lang",
    "Log",
    "Mail",
    "Notification",
    "Queue",
    "Redirect",
    "Request",
    "Response",
    "Route",
    "Session",
    "Storage",
    "URL",
    "Validator",
    "View",
    "Http",
    "Date",
    "Number",
};

static DB_FACADES: phf::Set<&'static str> = phf_set! {
    "DB",
    "Illuminate\\Support\\Facades\\DB",
    "Illuminate\\Database\\DatabaseManager",
};

static BUILDER_METHODS: phf::Set<&'static str> = phf_set! {
    "where",
    "whereIn",
    "whereNotIn",
    "whereNull",
    "whereNotNull",
    "whereBetween",
    "whereHas",
    "whereDate",
    "orWhere",
    "orderBy",
    "orderByDesc",
    "groupBy",
    "having",
    "join",
    "leftJoin",
    "select",
    "distinct",
    "limit",
    "take",
    "skip",
    "offset",
    "with",
    "withCount",
    "table",
    "latest",
    "oldest",
};

static FETCH_METHODS: phf::Set<&'static str> = phf_set! {
    "get",
    "all",
    "pluck",
    "cursor",
    "lazy",
    "paginate",
    "simplePaginate",
};

static COLLECTION_FILTER_METHODS: phf::Set<&'static str> = phf_set! {
    "filter",
    "where",
    "whereIn",
    "first",
    "firstWhere",
    "reject",
    "unique",
    "sortBy",
    "sortByDesc",
    "contains",
    "search",
    "count",
    "sum",
    "max",
    "min",
    "avg",
};

static FILESYSTEM_CLASSES: phf::Set<&'static str> = phf_set! {
    "Storage",
    "File",
    "Illuminate\\Support\\Facades\\Storage",
    "Illuminate\\Support\\Facades\\File",
    "Illuminate\\Filesystem\\Filesystem",
};

static FILESYSTEM_FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "file_get_contents",
    "file_put_contents",
    "fopen",
    "file_exists",
    "unlink",
    "mkdir",
    "rmdir",
    "copy",
    "rename",
    "is_dir",
    "is_file",
    "scandir",
    "glob",
    "chmod",
    "touch",
    "readfile",
};

static PATH_HELPERS: phf::Set<&'static str> = phf_set! {
    "storage_path",
    "base_path",
    "app_path",
    "public_path",
    "resource_path",
    "database_path",
    "config_path",
    "config",
    "env",
};

static LOGGING_CLASSES: phf::Set<&'static str> = phf_set! {
    "Log",
    "Illuminate\\Support\\Facades\\Log",
    "Bugsnag",
    "Sentry",
};

static LOGGING_FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "report",
    "logger",
    "info",
    "error_log",
    "abort",
    "rescue",
};

static RELATIONSHIP_METHODS: phf::Set<&'static str> = phf_set! {
    "hasOne",
    "hasMany",
    "belongsTo",
    "belongsToMany",
    "hasOneThrough",
    "hasManyThrough",
    "morphOne",
    "morphMany",
    "morphTo",
    "morphToMany",
    "morphedByMany",
};

static RESERVED_PROPERTIES: phf::Set<&'static str> = phf_set! {
    "id",
    "table",
    "fillable",
    "guarded",
    "hidden",
    "visible",
    "casts",
    "dates",
    "appends",
    "attributes",
    "timestamps",
    "exists",
    "incrementing",
    "primaryKey",
    "keyType",
    "connection",
    "perPage",
    "wasRecentlyCreated",
};

static EXCLUDED_FUNCTIONS: phf::Set<&'static str> = phf_set! {
    "collect",
    "str",
    "now",
    "today",
    "response",
    "view",
    "request",
    "session",
    "cache",
    "optional",
    "tap",
};

static ROUTE_REGISTRARS: phf::Set<&'static str> = phf_set! {
    "get",
    "post",
    "put",
    "patch",
    "delete",
    "options",
    "any",
    "match",
    "fallback",
};

/// The default production tables.
pub static DEFAULT_TABLES: Tables = Tables {
    excluded_classes: &EXCLUDED_CLASSES,
    model_namespaces: &["App\\Models\\", "App\\Model\\"],
    model_suffixes: &["Model"],
    db_facades: &DB_FACADES,
    builder_methods: &BUILDER_METHODS,
    fetch_methods: &FETCH_METHODS,
    collection_filter_methods: &COLLECTION_FILTER_METHODS,
    filesystem_classes: &FILESYSTEM_CLASSES,
    filesystem_functions: &FILESYSTEM_FUNCTIONS,
    path_helpers: &PATH_HELPERS,
    logging_classes: &LOGGING_CLASSES,
    logging_functions: &LOGGING_FUNCTIONS,
    relationship_methods: &RELATIONSHIP_METHODS,
    reserved_properties: &RESERVED_PROPERTIES,
    route_registrars: &ROUTE_REGISTRARS,
    excluded_functions: &EXCLUDED_FUNCTIONS,
    service_suffixes: &["Service", "Repository", "Manager", "Handler"],
};
