pub mod campaign;
pub mod campaign_product;
pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_variant;

pub use campaign::Entity as Campaign;
pub use campaign_product::Entity as CampaignProduct;
pub use category::Entity as Category;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use product_variant::Entity as ProductVariant;
