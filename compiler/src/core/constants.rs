// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "breedql";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".breedql";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "breedql.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "BREEDQL_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "BREEDQL_LOG";

/// Environment variable for the default page size
pub const ENV_ROWS_PER_PAGE: &str = "BREEDQL_ROWS_PER_PAGE";

// =============================================================================
// Compiler Defaults
// =============================================================================

/// Rows per page when a request does not specify one
pub const DEFAULT_ROWS_PER_PAGE: u32 = 100;

/// First page (pages are 1-indexed)
pub const DEFAULT_PAGE: u32 = 1;

/// Relation from an entity to its attribution rows
pub const DEFAULT_ATTRIBUTION_RELATION: &str = "attributions";

/// Table holding attribution rows; base table of attribute-row filters
pub const DEFAULT_ATTRIBUTION_TABLE: &str = "attributions_view";

/// Field of an attribution row holding the attribute id
pub const ATTRIBUTE_ID_FIELD: &str = "attribute_id";

/// Field attribution rows are ordered by in projections (newest first)
pub const ATTRIBUTION_DATE_FIELD: &str = "date_attributed";

/// Name of the fragment selecting attribution values
pub const ATTRIBUTION_FRAGMENT: &str = "AttributionFragment";

/// Fields selected by the attribution fragment, in order
pub const ATTRIBUTION_FRAGMENT_FIELDS: &[&str] = &[
    "id",
    "integer_value",
    "float_value",
    "text_value",
    "boolean_value",
    "date_value",
    "plant_id",
    "plant_group_id",
    "cultivar_id",
    "lot_id",
    "crossing_id",
    "data_type",
];

/// Alias prefix of projected attribute columns (`attribute_123`)
pub const ATTRIBUTE_ALIAS_PREFIX: &str = "attribute_";

/// Separator joining path segments in aliases of nested columns
pub const NESTED_ALIAS_SEPARATOR: &str = "__";
