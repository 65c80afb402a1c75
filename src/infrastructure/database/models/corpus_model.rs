use diesel::prelude::*;

use crate::domain::entities::CorpusDocument;
use crate::infrastructure::database::schema::corpus_posts;

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = corpus_posts)]
pub struct CorpusPostModel {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl From<CorpusPostModel> for CorpusDocument {
    fn from(model: CorpusPostModel) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
        }
    }
}
