mod alerts;
mod detections;
mod videos;
