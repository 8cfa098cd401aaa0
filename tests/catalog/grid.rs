//! Row edit modes and the new-row slot, driven through the catalog.

use catalog_sync::{
    ApiError, CommitOutcome, FieldValue, GridError, ItemDraft, MutationError, NoticeLevel, Operation,
    RowMode, NEW_ROW_ID,
};

use crate::support::{api, loaded, record};

#[tokio::test]
async fn only_one_new_row_at_a_time() {
    let catalog = loaded(api()).await;
    catalog.begin_add().unwrap();
    assert_eq!(catalog.begin_add().unwrap_err(), GridError::NewRowPending);

    let state = catalog.state();
    assert_eq!(state.rows.iter().filter(|row| row.is_new).count(), 1);
    assert!(state.rows[0].is_new);
    assert_eq!(state.rows[0].item.id, NEW_ROW_ID);
    assert_eq!(state.rows.len(), 6);
    assert_eq!(state.total, 5);

    assert!(catalog.cancel(NEW_ROW_ID));
    assert_eq!(catalog.state().rows.len(), 5);
    assert_eq!(catalog.api().calls(Operation::Create), 0);
    catalog.begin_add().unwrap();
}

#[tokio::test]
async fn buffered_cells_show_until_cancelled() {
    let catalog = loaded(api()).await;
    catalog.begin_edit(2).unwrap();
    catalog
        .set_cell(2, FieldValue::Title("Sit-Stand Desk".into()))
        .unwrap();

    let row = catalog.state().rows.into_iter().find(|row| row.item.id == 2).unwrap();
    assert_eq!(row.mode, RowMode::Editing);
    assert_eq!(row.item.title, "Sit-Stand Desk");
    assert_eq!(catalog.cache().data(&catalog.query()).unwrap().get(2).unwrap().title, "Standing Desk");

    assert!(catalog.cancel(2));
    let row = catalog.state().rows.into_iter().find(|row| row.item.id == 2).unwrap();
    assert_eq!(row.mode, RowMode::View);
    assert_eq!(row.item.title, "Standing Desk");
    assert_eq!(catalog.api().calls(Operation::Update), 0);
}

#[tokio::test]
async fn commit_of_existing_row_updates_it_in_place() {
    let catalog = loaded(api()).await;
    let states = record(&catalog);
    catalog.begin_edit(1).unwrap();
    let values = ItemDraft {
        price: 32.0,
        ..catalog.grid().edit(1).unwrap().baseline
    };

    let outcome = catalog.commit(1, values).await.unwrap();
    assert!(matches!(outcome, CommitOutcome::Updated(ref item) if item.price == 32.0));

    let state = catalog.state();
    let row = state.rows.iter().find(|row| row.item.id == 1).unwrap();
    assert_eq!(row.mode, RowMode::View);
    assert_eq!(row.item.price, 32.0);
    assert_eq!(state.notice.unwrap().message, "Updated Desk Lamp");
    assert!(states
        .lock()
        .unwrap()
        .iter()
        .any(|state| state.rows.iter().any(|row| row.item.id == 1 && row.saving)));
}

#[tokio::test]
async fn failed_commit_reverts_cells_and_keeps_row_editable() {
    let catalog = loaded(api()).await;
    catalog
        .api()
        .fail_next(Operation::Update, ApiError::Network("connection reset".into()));
    catalog.begin_edit(4).unwrap();
    let confirmed = catalog.grid().edit(4).unwrap().baseline;
    let values = ItemDraft {
        title: "Phone 2".into(),
        ..confirmed.clone()
    };

    let err = catalog.commit(4, values).await.unwrap_err();
    assert_eq!(
        err,
        GridError::Mutation(MutationError::Api(ApiError::Network("connection reset".into())))
    );

    let state = catalog.state();
    let row = state.rows.iter().find(|row| row.item.id == 4).unwrap();
    assert_eq!(row.mode, RowMode::Editing);
    assert_eq!(row.item.title, "Phone");
    assert_eq!(row.error, Some(err));
    assert_eq!(catalog.grid().edit(4).unwrap().buffer, confirmed);
    assert_eq!(state.notice.unwrap().level, NoticeLevel::Error);
}

#[tokio::test]
async fn invalid_commit_never_leaves_the_row() {
    let catalog = loaded(api()).await;
    catalog.begin_edit(4).unwrap();
    let values = ItemDraft {
        sku: "  ".into(),
        ..catalog.grid().edit(4).unwrap().baseline
    };

    let err = catalog.commit(4, values).await.unwrap_err();
    assert!(matches!(err, GridError::Validation(_)));
    assert_eq!(catalog.grid().mode(4), RowMode::Editing);
    assert_eq!(catalog.api().calls(Operation::Update), 0);
    assert_eq!(catalog.state().notice, None);
}

#[tokio::test]
async fn unknown_rows_cannot_be_edited() {
    let catalog = loaded(api()).await;
    assert_eq!(catalog.begin_edit(99).unwrap_err(), GridError::UnknownRow(99));
    assert_eq!(
        catalog.set_cell(99, FieldValue::Stock(1)).unwrap_err(),
        GridError::NotEditing(99)
    );
}
