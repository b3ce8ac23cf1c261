pub mod m202606010001_create_users;
pub mod m202606010002_create_clubs;
pub mod m202606010003_create_club_members;
pub mod m202606010004_create_events;
pub mod m202606010005_create_registrations;
pub mod m202606010006_create_attendances;
