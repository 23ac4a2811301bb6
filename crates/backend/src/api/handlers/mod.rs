pub mod d500_pharmacy_analytics;
