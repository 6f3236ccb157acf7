//! The per-request loader registry.

use std::sync::Arc;

use common::{
    AddressId, Money, OptionId, ProductId, TransactionId, UserId, VariantId,
};
use loader::{LoadResult, Loader, LoaderSlot};
use services::{ShippingService, TaxRates, TaxService};
use store::{
    Address, Product, ProductOption, ProductOptionValue, ProductVariant, Store, Transaction,
    TransactionAddressInfo, TransactionLineItem, TransactionStatus, User,
};

use crate::cart::SubtotalBatch;
use crate::keys::{AddressKey, CartKey, EstimationKey, PaginationKey, SelectedOptionsKey};
use crate::product::{
    OptionValuesBatch, ProductByIdBatch, ProductBySlugBatch, ProductOptionsBatch, ProductPageBatch,
};
use crate::shipping::{ShippingEstimate, ShippingEstimationsBatch};
use crate::taxes::TaxesBatch;
use crate::transaction::{
    TransactionAddressInfoBatch, TransactionByIdBatch, TransactionLineItemsBatch,
    TransactionStatusesBatch, TransactionsForUserBatch,
};
use crate::user::{AddressByIdBatch, AddressesForUserBatch, UserByIdBatch};
use crate::variant::{
    VariantByIdBatch, VariantBySelectedOptionsBatch, VariantOptionValuesBatch,
    VariantsForProductBatch,
};

/// One strongly-typed loader handle per batch function.
///
/// Built fresh at the start of request handling, carried in request-scoped
/// context, and discarded with the request. The cache it owns must never
/// cross request boundaries. Mutations call [`LoaderRegistry::clear_all`]
/// after their writes so later reads in the same request see fresh rows.
#[derive(Clone)]
pub struct LoaderRegistry {
    pub product_pages: Loader<PaginationKey, Vec<Product>>,
    pub product_by_id: Loader<ProductId, Product>,
    pub product_by_slug: Loader<String, Product>,
    pub product_options: Loader<ProductId, Vec<ProductOption>>,
    pub option_values: Loader<OptionId, Vec<ProductOptionValue>>,
    pub variant_by_id: Loader<VariantId, ProductVariant>,
    pub variants_for_product: Loader<ProductId, Vec<ProductVariant>>,
    pub variant_option_values: Loader<VariantId, Vec<ProductOptionValue>>,
    pub variant_by_selected_options: Loader<SelectedOptionsKey, Option<ProductVariant>>,
    pub subtotal: Loader<CartKey, Money>,
    pub taxes: Loader<AddressKey, TaxRates>,
    pub shipping_estimations: Loader<EstimationKey, Vec<ShippingEstimate>>,
    pub user_by_id: Loader<UserId, User>,
    pub address_by_id: Loader<AddressId, Address>,
    pub addresses_for_user: Loader<UserId, Vec<Address>>,
    pub transaction_by_id: Loader<TransactionId, Transaction>,
    pub transactions_for_user: Loader<UserId, Vec<Transaction>>,
    pub transaction_line_items: Loader<TransactionId, Vec<TransactionLineItem>>,
    pub transaction_address_info: Loader<TransactionId, TransactionAddressInfo>,
    pub transaction_statuses: Loader<TransactionId, Vec<TransactionStatus>>,
}

impl LoaderRegistry {
    /// Builds the registry for one request.
    ///
    /// `ship_from` is the warehouse origin used by shipping estimation.
    /// Must run inside a tokio runtime (each loader spawns a dispatcher).
    pub fn new(
        store: Arc<dyn Store>,
        tax: Arc<dyn TaxService>,
        shipping: Arc<dyn ShippingService>,
        ship_from: Address,
    ) -> Self {
        // The point lookups prime each other, so they are wired via slots.
        let by_id_slot: LoaderSlot<ProductId, Product> = LoaderSlot::new();
        let by_slug_slot: LoaderSlot<String, Product> = LoaderSlot::new();

        let product_by_id = Loader::new(
            "product_by_id",
            ProductByIdBatch::new(Arc::clone(&store), by_slug_slot.clone()),
        );
        let product_by_slug = Loader::new(
            "product_by_slug",
            ProductBySlugBatch::new(Arc::clone(&store), by_id_slot.clone()),
        );
        by_id_slot.set(product_by_id.clone());
        by_slug_slot.set(product_by_slug.clone());

        let product_pages = Loader::new(
            "product_pages",
            ProductPageBatch::new(
                Arc::clone(&store),
                product_by_id.clone(),
                product_by_slug.clone(),
            ),
        );
        let product_options = Loader::new(
            "product_options",
            ProductOptionsBatch::new(Arc::clone(&store)),
        );
        let option_values =
            Loader::new("option_values", OptionValuesBatch::new(Arc::clone(&store)));

        let variant_by_id =
            Loader::new("variant_by_id", VariantByIdBatch::new(Arc::clone(&store)));
        let variants_for_product = Loader::new(
            "variants_for_product",
            VariantsForProductBatch::new(Arc::clone(&store)),
        );
        let variant_option_values = Loader::new(
            "variant_option_values",
            VariantOptionValuesBatch::new(Arc::clone(&store)),
        );
        let variant_by_selected_options = Loader::new(
            "variant_by_selected_options",
            VariantBySelectedOptionsBatch::new(Arc::clone(&store), variant_by_id.clone()),
        );

        let subtotal = Loader::new("subtotal", SubtotalBatch::new(Arc::clone(&store)));
        let taxes = Loader::new("taxes", TaxesBatch::new(tax));
        let shipping_estimations = Loader::new(
            "shipping_estimations",
            ShippingEstimationsBatch::new(shipping, variant_by_id.clone(), ship_from),
        );

        let user_by_id = Loader::new("user_by_id", UserByIdBatch::new(Arc::clone(&store)));
        let address_by_id =
            Loader::new("address_by_id", AddressByIdBatch::new(Arc::clone(&store)));
        let addresses_for_user = Loader::new(
            "addresses_for_user",
            AddressesForUserBatch::new(Arc::clone(&store)),
        );

        let transaction_by_id = Loader::new(
            "transaction_by_id",
            TransactionByIdBatch::new(Arc::clone(&store)),
        );
        let transactions_for_user = Loader::new(
            "transactions_for_user",
            TransactionsForUserBatch::new(Arc::clone(&store)),
        );
        let transaction_line_items = Loader::new(
            "transaction_line_items",
            TransactionLineItemsBatch::new(Arc::clone(&store)),
        );
        let transaction_address_info = Loader::new(
            "transaction_address_info",
            TransactionAddressInfoBatch::new(Arc::clone(&store)),
        );
        let transaction_statuses = Loader::new(
            "transaction_statuses",
            TransactionStatusesBatch::new(Arc::clone(&store)),
        );

        let registry = Self {
            product_pages,
            product_by_id,
            product_by_slug,
            product_options,
            option_values,
            variant_by_id,
            variants_for_product,
            variant_option_values,
            variant_by_selected_options,
            subtotal,
            taxes,
            shipping_estimations,
            user_by_id,
            address_by_id,
            addresses_for_user,
            transaction_by_id,
            transactions_for_user,
            transaction_line_items,
            transaction_address_info,
            transaction_statuses,
        };
        // A new request starts from a clean slate.
        registry.clear_all();
        registry
    }

    /// Evicts every cache entry in every loader.
    pub fn clear_all(&self) {
        self.product_pages.clear_all();
        self.product_by_id.clear_all();
        self.product_by_slug.clear_all();
        self.product_options.clear_all();
        self.option_values.clear_all();
        self.variant_by_id.clear_all();
        self.variants_for_product.clear_all();
        self.variant_option_values.clear_all();
        self.variant_by_selected_options.clear_all();
        self.subtotal.clear_all();
        self.taxes.clear_all();
        self.shipping_estimations.clear_all();
        self.user_by_id.clear_all();
        self.address_by_id.clear_all();
        self.addresses_for_user.clear_all();
        self.transaction_by_id.clear_all();
        self.transactions_for_user.clear_all();
        self.transaction_line_items.clear_all();
        self.transaction_address_info.clear_all();
        self.transaction_statuses.clear_all();
    }

    /// Shipping options for a destination and cart. Returns the full quoted
    /// list; choosing one is the caller's decision.
    pub async fn estimate_shipping(
        &self,
        address: Address,
        cart: CartKey,
    ) -> LoadResult<Vec<ShippingEstimate>> {
        self.shipping_estimations
            .load(EstimationKey { address, cart })
            .await
    }
}
