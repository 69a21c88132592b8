use crate::{
    Conn, dtos,
    models::{NewStoredFile, StoredFile},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::DbError;

pub async fn insert_file<'a>(
    conn: &mut Conn<'a>,
    new_file: NewStoredFile,
) -> Result<StoredFile, DbError> {
    use crate::schema::stored_file::dsl::*;
    Ok(diesel::insert_into(stored_file)
        .values(&new_file)
        .returning(StoredFile::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn find_file<'a>(conn: &mut Conn<'a>, file_id: Uuid) -> Result<Option<StoredFile>, DbError> {
    use crate::schema::stored_file::dsl::*;
    Ok(stored_file
        .filter(id.eq(file_id))
        .select(StoredFile::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn list_files<'a>(
    conn: &mut Conn<'a>,
    owner: Uuid,
    pagination: dtos::Pagination,
) -> Result<Vec<StoredFile>, DbError> {
    use crate::schema::stored_file::dsl::*;
    Ok(stored_file
        .filter(owner_id.eq(owner))
        .order(created_at.desc())
        .offset(pagination.offset)
        .limit(pagination.limit)
        .select(StoredFile::as_select())
        .load(conn)
        .await?)
}

/// Delete the metadata row. Returns the removed file so the caller can drop the object.
pub async fn delete_file<'a>(
    conn: &mut Conn<'a>,
    file_id: Uuid,
) -> Result<Option<StoredFile>, DbError> {
    use crate::schema::stored_file::dsl::*;
    Ok(diesel::delete(stored_file.filter(id.eq(file_id)))
        .returning(StoredFile::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}
