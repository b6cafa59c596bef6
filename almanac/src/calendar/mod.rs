mod export;

pub use export::{
    escape_text, render_calendar, CalendarDocument, CalendarExporter, CALENDAR_CONTENT_TYPE,
    MISSING_DESCRIPTION, PRODID,
};
