use std::collections::BTreeMap;

use rusqlite::params;

use super::*;

impl RecordingsDb {
    // =========================================================================
    // Metadata
    // =========================================================================

    /// All metadata rows of `owner`, ordered by name.
    pub fn get_metadata(&self, owner: MetadataOwner) -> Result<Vec<DbMetadata>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, content
             FROM metadata
             WHERE owner_type = ?1 AND owner_id = ?2
             ORDER BY name",
        )?;
        let rows = stmt.query_map(params![owner.owner_type(), owner.owner_id()], |row| {
            Ok(DbMetadata {
                id: row.get(0)?,
                name: row.get(1)?,
                content: row.get(2)?,
            })
        })?;

        let mut metadata = Vec::new();
        for row in rows {
            metadata.push(row?);
        }
        Ok(metadata)
    }

    /// Make the stored metadata of `owner` match `incoming` exactly.
    ///
    /// Rows are upserted by name first and only then are names missing from
    /// `incoming` deleted, so the owner never passes through an empty set.
    pub fn sync_metadata(
        &self,
        owner: MetadataOwner,
        incoming: &BTreeMap<String, Option<String>>,
    ) -> Result<(), DbError> {
        {
            let mut upsert = self.conn.prepare_cached(
                "INSERT INTO metadata (owner_type, owner_id, name, content)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner_type, owner_id, name)
                 DO UPDATE SET content = excluded.content",
            )?;
            for (name, content) in incoming {
                upsert.execute(params![owner.owner_type(), owner.owner_id(), name, content])?;
            }
        }

        let names: Vec<&String> = incoming.keys().collect();
        let names_json = serde_json::to_string(&names)?;
        self.conn.execute(
            "DELETE FROM metadata
             WHERE owner_type = ?1 AND owner_id = ?2
               AND name NOT IN (SELECT value FROM json_each(?3))",
            params![owner.owner_type(), owner.owner_id(), names_json],
        )?;
        Ok(())
    }

    /// Remove every metadata row of `owner`.
    pub fn delete_all_metadata(&self, owner: MetadataOwner) -> Result<usize, DbError> {
        let affected = self.conn.execute(
            "DELETE FROM metadata WHERE owner_type = ?1 AND owner_id = ?2",
            params![owner.owner_type(), owner.owner_id()],
        )?;
        Ok(affected)
    }
}
