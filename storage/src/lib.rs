//storage keeps named relief masks in MongoDB

pub mod models;

use crate::models::MaskDoc;
use bson::doc;
use futures_util::stream::TryStreamExt;
use log::{debug, info};
use mongodb::{Client, Collection, IndexModel, options::ClientOptions, options::IndexOptions};
use relief_core::{MaskError, MaskRecord, SurfaceField};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    // Stored document does not describe a valid mask
    #[error("stored mask is invalid: {0}")]
    Codec(#[from] MaskError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct MaskStore {
    col: Collection<MaskDoc>,
}

impl MaskStore {
    // Connect and make sure mask names are unique
    pub async fn init(uri: &str, db_name: &str, col_name: &str) -> Result<Self> {
        let mut opts = ClientOptions::parse(uri).await?;
        opts.app_name = Some("ReliefMaskStore".to_string());
        let client = Client::with_options(opts)?;
        let col = client.database(db_name).collection(col_name);

        let index_model = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(index_model).await?;
        debug!("mask store ready: {db_name}.{col_name}");

        Ok(Self { col })
    }

    pub async fn list_names(&self) -> Result<Vec<String>> {
        let mut cursor = self.col.find(doc! {}).sort(doc! { "name": 1 }).await?;
        let mut names = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            names.push(doc.name);
        }
        Ok(names)
    }

    // Stores `field` under `name`, replacing any earlier mask of that name
    // in one write so a failed save keeps the old one.
    pub async fn save(&self, name: &str, field: &SurfaceField) -> Result<()> {
        let doc_obj = MaskDoc {
            id: None,
            name: name.to_string(),
            updated_at: bson::DateTime::now(),
            mask: MaskRecord::from(field),
        };
        self.col
            .replace_one(doc! { "name": name }, doc_obj)
            .upsert(true)
            .await?;
        info!("saved {}x{} mask as {name:?}", field.xdim(), field.ydim());
        Ok(())
    }

    pub async fn read_by_name(&self, name: &str) -> Result<Option<MaskDoc>> {
        Ok(self.col.find_one(doc! { "name": name }).await?)
    }

    // Loads and validates the mask stored under `name`.
    pub async fn load(&self, name: &str) -> Result<Option<SurfaceField>> {
        match self.read_by_name(name).await? {
            Some(doc) => Ok(Some(SurfaceField::try_from(doc.mask)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        let res = self.col.delete_one(doc! { "name": name }).await?;
        Ok(res.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::models::MaskDoc;
    use relief_core::{MaskRecord, Surface, SurfaceField};

    #[test]
    fn mask_doc_round_trips_through_bson() {
        let mut field = SurfaceField::new(6, 3);
        field
            .ridge_mut(2, Surface::Bottom)
            .unwrap()
            .insert_point(3, 0.5)
            .unwrap();
        let doc = MaskDoc {
            id: None,
            name: "dome".into(),
            updated_at: bson::DateTime::from_millis(0),
            mask: MaskRecord::from(&field),
        };

        let raw = bson::to_document(&doc).unwrap();
        assert!(!raw.contains_key("_id"));
        assert!(raw.get_document("mask").unwrap().contains_key("btmRidges"));

        let back: MaskDoc = bson::from_document(raw).unwrap();
        assert_eq!(SurfaceField::try_from(back.mask).unwrap(), field);
    }
}
