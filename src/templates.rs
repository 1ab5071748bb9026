use askama::Template;

#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct Index {
    pub(crate) model: String
}

#[derive(Template)]
#[template(path = "result.html")]
pub(crate) struct GeneratedImage {
    pub(crate) image_url: String,
    pub(crate) prompt: String,
    pub(crate) prediction_id: String,
    pub(crate) predict_time: Option<String>
}

#[derive(Template)]
#[template(path = "404.html")]
pub(crate) struct NotFound;
