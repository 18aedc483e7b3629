/// Locations of the associations published during this run, in publication
/// order. Created once at startup and handed to whatever publishes or
/// filters.
#[derive(Debug, Clone, Default)]
pub struct CreatedResources {
    resources: Vec<String>,
}

impl CreatedResources {
    pub fn new() -> CreatedResources {
        CreatedResources::default()
    }

    pub fn add(&mut self, url: impl Into<String>) {
        self.resources.push(url.into());
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}
