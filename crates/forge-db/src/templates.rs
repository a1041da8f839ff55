//! Saved alert templates. Built-in rows are read-only.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::{new_id, now_iso, Database, DbError, OptionalExt};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub spec_json: String,
    pub is_builtin: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub spec_json: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub spec_json: Option<String>,
}

impl Database {
    pub fn create_template(&self, new: NewTemplate) -> Result<Template, DbError> {
        let name = new
            .name
            .ok_or_else(|| DbError::InvalidData("name is required".into()))?;
        let spec_json = new
            .spec_json
            .ok_or_else(|| DbError::InvalidData("spec_json is required".into()))?;
        if serde_json::from_str::<serde_json::Value>(&spec_json).is_err() {
            return Err(DbError::InvalidData("spec_json is not valid JSON".into()));
        }

        let now = now_iso();
        let template = Template {
            id: new_id(),
            name,
            description: new.description.unwrap_or_default(),
            author: new.author.unwrap_or_default(),
            spec_json,
            is_builtin: false,
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO templates (
                    id, name, description, author, spec_json, is_builtin,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    template.id,
                    template.name,
                    template.description,
                    template.author,
                    template.spec_json,
                    template.is_builtin,
                    template.created_at,
                    template.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(template)
    }

    pub fn get_template(&self, id: &str) -> Result<Template, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{TEMPLATE_SELECT} WHERE id = ?1"))?;
            stmt.query_row([id], template_from_row)
                .optional()?
                .ok_or_else(|| DbError::NotFound(format!("template {id}")))
        })
    }

    /// Built-ins first, then user templates by creation time.
    pub fn list_templates(&self) -> Result<Vec<Template>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{TEMPLATE_SELECT} ORDER BY is_builtin DESC, created_at ASC"
            ))?;
            let rows = stmt.query_map([], template_from_row)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Partial update. Built-in templates are rejected untouched.
    pub fn update_template(&self, id: &str, patch: TemplatePatch) -> Result<Template, DbError> {
        let mut template = self.get_template(id)?;
        if template.is_builtin {
            return Err(DbError::Forbidden(format!(
                "built-in template {id} cannot be modified"
            )));
        }

        if let Some(v) = patch.name {
            template.name = v;
        }
        if let Some(v) = patch.description {
            template.description = v;
        }
        if let Some(v) = patch.author {
            template.author = v;
        }
        if let Some(v) = patch.spec_json {
            if serde_json::from_str::<serde_json::Value>(&v).is_err() {
                return Err(DbError::InvalidData("spec_json is not valid JSON".into()));
            }
            template.spec_json = v;
        }
        template.updated_at = now_iso();

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE templates SET
                    name = ?2, description = ?3, author = ?4, spec_json = ?5,
                    updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    template.id,
                    template.name,
                    template.description,
                    template.author,
                    template.spec_json,
                    template.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(template)
    }

    pub fn delete_template(&self, id: &str) -> Result<(), DbError> {
        let template = self.get_template(id)?;
        if template.is_builtin {
            return Err(DbError::Forbidden(format!(
                "built-in template {id} cannot be deleted"
            )));
        }
        self.with_conn(|conn| {
            conn.execute("DELETE FROM templates WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

const TEMPLATE_SELECT: &str = "SELECT
    id, name, description, author, spec_json, is_builtin, created_at, updated_at
 FROM templates";

fn template_from_row(row: &Row<'_>) -> Result<Template, rusqlite::Error> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        author: row.get(3)?,
        spec_json: row.get(4)?,
        is_builtin: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
