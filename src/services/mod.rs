// Services module - business logic layer

pub mod autosave;
pub mod calendar;
pub mod catalog_service;
pub mod dependency_validator;
pub mod gestures;
pub mod pricing;
pub mod quote_editor;
pub mod reorder;
pub mod saved_quotes;

pub use autosave::{Autosaver, DebouncedSave, PendingSave, SaveStatus};
pub use calendar::{layout_lanes, CalendarEvent, CalendarService, LaneEvent};
pub use catalog_service::CatalogService;
pub use dependency_validator::DependencyValidator;
pub use gestures::{
    hit_test, DragController, DragSession, DropFeedback, DropTarget, GestureConfig,
    HapticPattern, PointerDrag, RowBounds, TouchDrag, TouchPhase, TouchRelease,
};
pub use pricing::{
    format_currency, service_discount_amount, LinePricing, PricingAggregator, QuoteTotals,
};
pub use quote_editor::{QuoteEditor, QuoteMetadata};
pub use reorder::{is_valid_drop_target, MoveOutcome, ReorderEngine, ReorderRequest};
pub use saved_quotes::SavedQuoteService;
