use super::{decimal_at, money, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::{ClientLiving, LivingKind, Property, PropertyStatus, Rental},
    types::{Day, EntityId},
};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        property_id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        price: decimal_at(row, 3)?,
        status: row.get(4)?,
        owner_client_id: row.get(5)?,
    })
}

fn living_from_row(row: &Row<'_>) -> rusqlite::Result<ClientLiving> {
    Ok(ClientLiving {
        client_id: row.get(0)?,
        kind: row.get(1)?,
        rental_id: row.get(2)?,
        property_id: row.get(3)?,
        monthly_rent: decimal_at(row, 4)?,
        next_rent_day: row.get(5)?,
    })
}

impl SimStore {
    // ── Rentals ───────────────────────────────────────────────────

    pub fn insert_rental(&self, name: &str, monthly_rent: Decimal) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO rental (name, monthly_rent) VALUES (?1, ?2)",
            params![name, money(&monthly_rent)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn rental(&self, rental_id: EntityId) -> SimResult<Rental> {
        self.conn
            .query_row(
                "SELECT rental_id, name, monthly_rent FROM rental WHERE rental_id = ?1",
                params![rental_id],
                |row| {
                    Ok(Rental {
                        rental_id: row.get(0)?,
                        name: row.get(1)?,
                        monthly_rent: decimal_at(row, 2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| SimError::not_found("rental", rental_id))
    }

    // ── Properties ────────────────────────────────────────────────

    pub fn insert_property(
        &self,
        account_id: EntityId,
        name: &str,
        price: Decimal,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO property (account_id, name, price) VALUES (?1, ?2, ?3)",
            params![account_id, name, money(&price)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn property(&self, property_id: EntityId) -> SimResult<Property> {
        self.conn
            .query_row(
                "SELECT property_id, account_id, name, price, status, owner_client_id
                 FROM property WHERE property_id = ?1",
                params![property_id],
                property_from_row,
            )
            .optional()?
            .ok_or_else(|| SimError::not_found("property", property_id))
    }

    pub fn update_property_owner(
        &self,
        property_id: EntityId,
        status: PropertyStatus,
        owner_client_id: Option<EntityId>,
    ) -> SimResult<()> {
        self.conn.execute(
            "UPDATE property SET status = ?1, owner_client_id = ?2 WHERE property_id = ?3",
            params![status, owner_client_id, property_id],
        )?;
        Ok(())
    }

    // ── Client living ─────────────────────────────────────────────

    pub fn client_living(&self, client_id: EntityId) -> SimResult<ClientLiving> {
        self.conn
            .query_row(
                "SELECT client_id, kind, rental_id, property_id, monthly_rent, next_rent_day
                 FROM client_living WHERE client_id = ?1",
                params![client_id],
                living_from_row,
            )
            .optional()?
            .ok_or_else(|| SimError::not_found("client living", client_id))
    }

    pub fn save_client_living(&self, l: &ClientLiving) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO client_living (client_id, kind, rental_id, property_id, monthly_rent, next_rent_day)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (client_id) DO UPDATE SET
                kind = excluded.kind,
                rental_id = excluded.rental_id,
                property_id = excluded.property_id,
                monthly_rent = excluded.monthly_rent,
                next_rent_day = excluded.next_rent_day",
            params![
                l.client_id,
                l.kind,
                l.rental_id,
                l.property_id,
                money(&l.monthly_rent),
                l.next_rent_day,
            ],
        )?;
        Ok(())
    }

    /// Client ids under an account whose living arrangement carries rent.
    pub fn rent_paying_client_ids(&self, account_id: EntityId) -> SimResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.client_id
             FROM client_living l JOIN client c ON c.client_id = l.client_id
             WHERE c.account_id = ?1 AND l.kind = ?2
             ORDER BY l.client_id",
        )?;
        let rows = stmt.query_map(params![account_id, LivingKind::Rental], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_next_rent_day(&self, client_id: EntityId, day: Option<Day>) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client_living SET next_rent_day = ?1 WHERE client_id = ?2",
            params![day, client_id],
        )?;
        Ok(())
    }
}
