/// Application name
pub const APP_NAME: &str = "ChatFlow";

/// Author name the server uses for join/leave announcements
pub const SYSTEM_USER: &str = "System";

/// Maximum upload size in bytes (16 MiB)
pub const MAX_UPLOAD_SIZE: u64 = 16 * 1024 * 1024;

/// MIME types accepted by the upload endpoint
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "video/mp4",
    "audio/mpeg",
];

/// Archive type accepted only when the deployment enables it
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Path prefix under which the server serves uploaded files
pub const UPLOADS_PATH: &str = "/uploads/";

/// Quiet period after the last keystroke before `stop_typing` is sent
pub const TYPING_STOP_MS: u64 = 1_000;

/// Interval between idle checks
pub const IDLE_CHECK_SECS: u64 = 60;

/// Inactivity after which the user is reported away
pub const IDLE_THRESHOLD_SECS: u64 = 5 * 60;

/// Characters of the message body shown in a desktop alert
pub const ALERT_BODY_CHARS: usize = 100;

/// Desktop alert lifetime in milliseconds
pub const ALERT_TIMEOUT_MS: u64 = 5_000;

/// Lifetime of a transient in-app notice in milliseconds
pub const NOTICE_TIMEOUT_MS: u64 = 4_000;

/// Delay before handing off to the login surface
pub const AUTH_REDIRECT_DELAY_MS: u64 = 2_000;
