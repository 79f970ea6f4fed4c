use rusqlite::params;

use crate::db::models::{Category, Shop};
use crate::deals::DealError;
use crate::state::DbPool;

/// Lowercase ASCII slug: "Home & Garden" -> "home-garden".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Categories and shops that deals are filed under.
#[derive(Clone)]
pub struct Catalog {
    pool: DbPool,
}

impl Catalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn categories(&self) -> Result<Vec<Category>, DealError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, name, slug FROM categories ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_category(&self, name: &str) -> Result<Category, DealError> {
        let (name, slug) = name_and_slug(name)?;
        let conn = self.pool.get()?;
        if slug_taken(&conn, "categories", &slug)? {
            return Err(DealError::Invalid(format!("Category '{}' already exists", name)));
        }

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO categories (id, name, slug) VALUES (?1, ?2, ?3)",
            params![id, name, slug],
        )?;
        Ok(Category { id, name, slug })
    }

    pub fn delete_category(&self, id: &str) -> Result<(), DealError> {
        delete_by_id(&self.pool, "categories", id)
    }

    pub fn shops(&self) -> Result<Vec<Shop>, DealError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, name, slug, website FROM shops ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Shop {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    website: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_shop(&self, name: &str, website: Option<&str>) -> Result<Shop, DealError> {
        let (name, slug) = name_and_slug(name)?;
        let website = website.map(str::trim).filter(|w| !w.is_empty());
        if website.is_some_and(|w| !w.starts_with("https://") && !w.starts_with("http://")) {
            return Err(DealError::Invalid(
                "Website must start with http:// or https://".into(),
            ));
        }

        let conn = self.pool.get()?;
        if slug_taken(&conn, "shops", &slug)? {
            return Err(DealError::Invalid(format!("Shop '{}' already exists", name)));
        }

        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO shops (id, name, slug, website) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, slug, website],
        )?;
        Ok(Shop {
            id,
            name,
            slug,
            website: website.map(str::to_string),
        })
    }

    pub fn delete_shop(&self, id: &str) -> Result<(), DealError> {
        delete_by_id(&self.pool, "shops", id)
    }
}

fn name_and_slug(raw: &str) -> Result<(String, String), DealError> {
    let name = raw.trim().to_string();
    if name.is_empty() || name.chars().count() > 80 {
        return Err(DealError::Invalid("Name must be 1 to 80 characters".into()));
    }
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(DealError::Invalid("Name needs at least one letter or digit".into()));
    }
    Ok((name, slug))
}

fn slug_taken(conn: &rusqlite::Connection, table: &str, slug: &str) -> Result<bool, DealError> {
    let taken = conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {} WHERE slug = ?1", table),
        params![slug],
        |r| r.get(0),
    )?;
    Ok(taken)
}

fn delete_by_id(pool: &DbPool, table: &str, id: &str) -> Result<(), DealError> {
    let conn = pool.get()?;
    let rows = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
    if rows == 0 {
        return Err(DealError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn create_catalog() -> (Catalog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        (Catalog::new(pool), temp_dir)
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Home & Garden"), "home-garden");
        assert_eq!(slugify("  Video Games!! "), "video-games");
        assert_eq!(slugify("4K TVs"), "4k-tvs");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn create_and_list_categories() {
        let (catalog, _tmp) = create_catalog();
        catalog.create_category("Travel").unwrap();
        let books = catalog.create_category("Books").unwrap();
        assert_eq!(books.slug, "books");

        let names: Vec<String> = catalog
            .categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Books", "Travel"]);
    }

    #[test]
    fn duplicate_slug_is_rejected() {
        let (catalog, _tmp) = create_catalog();
        catalog.create_category("Home & Garden").unwrap();
        assert!(matches!(
            catalog.create_category("home garden"),
            Err(DealError::Invalid(_))
        ));
    }

    #[test]
    fn shop_website_must_be_http() {
        let (catalog, _tmp) = create_catalog();
        assert!(catalog.create_shop("Acme", Some("ftp://acme")).is_err());
        let shop = catalog.create_shop("Acme", Some(" https://acme.example ")).unwrap();
        assert_eq!(shop.website.as_deref(), Some("https://acme.example"));
        assert_eq!(catalog.shops().unwrap().len(), 1);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (catalog, _tmp) = create_catalog();
        assert!(matches!(catalog.delete_shop("nope"), Err(DealError::NotFound)));
        let c = catalog.create_category("Toys").unwrap();
        catalog.delete_category(&c.id).unwrap();
        assert!(catalog.categories().unwrap().is_empty());
    }
}
