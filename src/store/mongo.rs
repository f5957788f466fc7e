use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, error};
use mongodb::bson::{doc, from_document, oid::ObjectId, to_bson, to_document, Bson, Document};
use mongodb::{options::ClientOptions, Client, Collection, Cursor, Database};

use super::{TaskStore, TASKS_COLLECTION};
use crate::error::TaskResult;
use crate::models::{normalize_email, Role, SharedWith, TaskRecord};

pub struct MongoTaskStore {
    tasks: Collection<Document>,
}

impl MongoTaskStore {
    pub async fn connect(uri: &str, db_name: &str) -> TaskResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        Ok(Self::new(&client.database(db_name)))
    }

    pub fn new(db: &Database) -> Self {
        MongoTaskStore {
            tasks: db.collection::<Document>(TASKS_COLLECTION),
        }
    }

    async fn collect(&self, mut cursor: Cursor<Document>) -> TaskResult<Vec<TaskRecord>> {
        let mut records = Vec::new();
        while let Some(res) = cursor.next().await {
            match res {
                Ok(document) => records.push(decode(document)?),
                Err(e) => {
                    error!("Cursor error reading tasks: {}", e);
                    return Err(e.into());
                }
            }
        }
        Ok(records)
    }
}

/// Ids that are not valid ObjectIds cannot name a stored task.
fn object_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// Anchored pattern matching `email` ignoring case and surrounding whitespace,
/// for use with the `i` option.
fn email_regex(email: &str) -> String {
    format!(r"^\s*{}\s*$", regex::escape(&normalize_email(email)))
}

fn email_filter(email: &str) -> Document {
    doc! { "$regex": email_regex(email), "$options": "i" }
}

fn decode(document: Document) -> TaskResult<TaskRecord> {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let mut record: TaskRecord = from_document(document)?;
    record.id = id;
    Ok(record)
}

#[async_trait]
impl TaskStore for MongoTaskStore {
    async fn find_by_owner(&self, user_id: &str) -> TaskResult<Vec<TaskRecord>> {
        let cursor = self.tasks.find(doc! { "userId": user_id }).await?;
        self.collect(cursor).await
    }

    async fn find_shared_with(&self, email: &str, roles: &[Role]) -> TaskResult<Vec<TaskRecord>> {
        let roles: Vec<&str> = roles.iter().map(Role::as_str).collect();
        let filter = doc! {
            "sharedWith": {
                "$elemMatch": { "email": email_filter(email), "role": { "$in": roles } }
            }
        };
        debug!("Querying shared tasks with filter {:?}", filter);
        let cursor = self.tasks.find(filter).await?;
        self.collect(cursor).await
    }

    async fn find_by_id(&self, id: &str) -> TaskResult<Option<TaskRecord>> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        match self.tasks.find_one(doc! { "_id": oid }).await? {
            Some(document) => Ok(Some(decode(document)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: TaskRecord) -> TaskResult<String> {
        let document = to_document(&record)?;
        let res = self.tasks.insert_one(document).await?;
        Ok(match res.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        })
    }

    async fn merge_fields(&self, id: &str, fields: TaskRecord) -> TaskResult<bool> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let set_doc = to_document(&fields)?;
        let res = self
            .tasks
            .update_one(doc! { "_id": oid }, doc! { "$set": set_doc })
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn delete(&self, id: &str) -> TaskResult<bool> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let res = self.tasks.delete_one(doc! { "_id": oid }).await?;
        Ok(res.deleted_count == 1)
    }

    async fn upsert_grant(&self, id: &str, grant: &SharedWith) -> TaskResult<bool> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };

        // Drop every element for this email and append the new grant in one
        // pipeline update, so concurrent shares cannot leave duplicates.
        let element = to_bson(grant)?;
        let pipeline = vec![doc! {
            "$set": {
                "sharedWith": {
                    "$concatArrays": [
                        {
                            "$filter": {
                                "input": { "$ifNull": ["$sharedWith", []] },
                                "as": "grant",
                                "cond": {
                                    "$not": [{
                                        "$regexMatch": {
                                            "input": { "$ifNull": ["$$grant.email", ""] },
                                            "regex": email_regex(&grant.email),
                                            "options": "i",
                                        }
                                    }]
                                },
                            }
                        },
                        [element],
                    ]
                }
            }
        }];
        let res = self.tasks.update_one(doc! { "_id": oid }, pipeline).await?;
        Ok(res.matched_count == 1)
    }

    async fn remove_grants(&self, id: &str, email: &str) -> TaskResult<bool> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let res = self
            .tasks
            .update_one(
                doc! { "_id": oid },
                doc! { "$pull": { "sharedWith": { "email": email_filter(email) } } },
            )
            .await?;
        Ok(res.modified_count == 1)
    }
}
