use crate::utils::error::Result;

pub trait Storage {
    fn write_file(&self, name: &str, data: &[u8]) -> Result<()>;
    /// `name` 寫入後的完整位置，用於回報輸出路徑
    fn location(&self, name: &str) -> String;
}

pub trait ConfigProvider {
    fn input_path(&self) -> &str;
    /// 輸出檔名前綴，例如 `fy26` 產生 `fy26_tracking.json`
    fn report_prefix(&self) -> String;
    fn bundle_outputs(&self) -> bool;
}

pub trait Pipeline {
    type Source;
    type Report;

    /// Short label used in the engine's log lines, e.g. `tracking`.
    fn name(&self) -> &str;
    fn extract(&self) -> Result<Self::Source>;
    fn transform(&self, source: Self::Source) -> Result<Self::Report>;
    /// Writes the report and returns the location of the primary output.
    fn load(&self, report: &Self::Report) -> Result<String>;
}
