/// Maximum length for workflow and task names.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length for workflow descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 4000;

/// Maximum length of a node id or parameter key in a sweep override.
pub const MAX_OVERRIDE_KEY_LEN: usize = 255;

/// Maximum size of an item result reported by the executor (1MB).
pub const MAX_RESULT_BYTES: usize = 1024 * 1024;

/// Maximum length of an item error message.
pub const MAX_ERROR_LEN: usize = 4000;

/// Maximum email length (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Password length bounds.
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Maximum display name length.
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Maximum site setting key length.
pub const MAX_SETTING_KEY_LEN: usize = 100;

/// Maximum serialized site setting value size (64KB).
pub const MAX_SETTING_VALUE_BYTES: usize = 65536;

/// Notification text bounds.
pub const MAX_NOTIFICATION_TITLE_LEN: usize = 200;
pub const MAX_NOTIFICATION_BODY_LEN: usize = 10000;

/// Maximum length of an uploaded file's name.
pub const MAX_FILENAME_LEN: usize = 255;
