use crate::model::SeriesModel;
use promock_core::Result;

pub struct JsonExporter;

impl JsonExporter {
    pub fn to_string<'a, I>(models: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a SeriesModel>,
    {
        let models: Vec<&SeriesModel> = models.into_iter().collect();
        Ok(serde_json::to_string_pretty(&models)?)
    }
}
