mod settings;

pub use settings::{
    Cli, InputSettings, PtySettings, ReportSettings, Settings, SinkKind, SupabaseSettings,
};
