pub mod loader;
pub mod schema;

pub use loader::{
    default_config_path, load_config, load_config_from_str, parse_date, validate_config,
    ConfigOverrides, CONFIG_FILE_NAME,
};
pub use schema::{
    AttachmentsConfig, CharsetsConfig, Config, DateRange, FetchConfig, ImapSettings, MailsConfig,
    OutputConfig, RendererConfig,
};
