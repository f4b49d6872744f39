pub mod diagnosis; // Nasal photo diagnosis: classify → normalize → render
